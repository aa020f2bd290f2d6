//! Retrieval-augmented-generation front end: documents in, questions answered
//! with the closest stored documents.

use crate::distance::SpaceType;
use crate::embedding::Embedder;
use crate::error::{EngineError, Result};
use crate::manager::{IndexHandle, IndexManager};
use crate::schema::{IndexBackend, IndexConfig};
use crate::storage::{Metadata, QueryResult, VectorRecord};
use crate::vector::Precision;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Length, in characters, of the id derived from a document's text.
pub const DERIVED_ID_CHARS: usize = 20;

pub const DEFAULT_TOP_K: i64 = 3;

/// Id for a document added without one: its first [`DERIVED_ID_CHARS`]
/// characters. Distinct documents with the same prefix share an id, and
/// the later upsert replaces the earlier one.
pub fn derive_doc_id(text: &str) -> String {
    text.chars().take(DERIVED_ID_CHARS).collect()
}

#[derive(Debug, Serialize)]
pub struct CreateIndexResponse {
    pub status: &'static str,
    pub index_name: String,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AddDocumentResponse {
    pub status: &'static str,
    pub doc_id: String,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub question: String,
    pub results: Vec<QueryResult>,
}

/// Embeds text and routes it to one named index.
#[derive(Debug, Clone)]
pub struct RagService {
    manager: Arc<IndexManager>,
    embedder: Arc<dyn Embedder>,
    index_name: String,
    backend: IndexBackend,
}

impl RagService {
    pub fn new(
        manager: Arc<IndexManager>,
        embedder: Arc<dyn Embedder>,
        index_name: impl Into<String>,
    ) -> Self {
        Self {
            manager,
            embedder,
            index_name: index_name.into(),
            backend: IndexBackend::Flat,
        }
    }

    pub fn with_backend(mut self, backend: IndexBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    fn index(&self) -> Result<Arc<IndexHandle>> {
        self.manager.get_index(&self.index_name)
    }

    /// Create the document index: cosine space, float32, sized to the embedder.
    pub fn create_index(&self) -> Result<CreateIndexResponse> {
        let config = IndexConfig::new(
            self.embedder.dimension(),
            SpaceType::Cosine,
            Precision::Float32,
        )
        .with_backend(self.backend.clone());
        self.manager.create_index(&self.index_name, config)?;

        Ok(CreateIndexResponse {
            status: "created",
            index_name: self.index_name.clone(),
            message: "Index created successfully",
        })
    }

    pub async fn add_document(&self, text: &str, doc_id: Option<&str>) -> Result<AddDocumentResponse> {
        if text.trim().is_empty() {
            return Err(EngineError::invalid("document text must not be empty"));
        }
        let index = self.index()?;
        let doc_id = match doc_id.filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => {
                let derived = derive_doc_id(text);
                if index.get(&derived).is_ok() {
                    warn!(doc_id = %derived, "derived id collides with an existing document, replacing it");
                }
                derived
            }
        };

        let vector = self.embedder.embed(text).await?;
        let mut metadata = Metadata::new();
        metadata.insert("text".to_string(), serde_json::Value::String(text.to_string()));
        index.upsert(vec![VectorRecord::new(doc_id.clone(), vector).with_metadata(metadata)])?;

        info!(index = %self.index_name, doc_id = %doc_id, "added document");
        Ok(AddDocumentResponse {
            status: "added",
            doc_id,
            message: "Document added successfully",
        })
    }

    pub async fn search(&self, question: &str, top_k: i64) -> Result<SearchResponse> {
        let top_k = usize::try_from(top_k)
            .ok()
            .filter(|&k| k > 0)
            .ok_or_else(|| EngineError::invalid(format!("top_k must be positive, got {}", top_k)))?;
        let index = self.index()?;

        let vector = self.embedder.embed(question).await?;
        let results = index.query(&vector, top_k)?;

        Ok(SearchResponse {
            question: question.to_string(),
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::TrigramEmbedder;

    fn service() -> RagService {
        RagService::new(
            Arc::new(IndexManager::new()),
            Arc::new(TrigramEmbedder::new(128)),
            "test_index",
        )
    }

    #[test]
    fn test_derive_doc_id() {
        assert_eq!(derive_doc_id("short"), "short");
        assert_eq!(
            derive_doc_id("The capital of India is New Delhi."),
            "The capital of India"
        );
        // counts characters, not bytes
        assert_eq!(derive_doc_id(&"é".repeat(30)).chars().count(), 20);
    }

    #[tokio::test]
    async fn test_create_add_search() {
        let rag = service();
        let created = rag.create_index().unwrap();
        assert_eq!(created.status, "created");
        assert!(matches!(rag.create_index(), Err(EngineError::AlreadyExists { .. })));

        for (text, id) in [
            ("The capital of India is New Delhi.", "doc1"),
            ("The Taj Mahal is located in Agra.", "doc3"),
            ("Bengaluru is known as the Silicon Valley of India.", "doc4"),
        ] {
            rag.add_document(text, Some(id)).await.unwrap();
        }

        let found = rag.search("Where is the Taj Mahal located?", 2).await.unwrap();
        assert_eq!(found.results.len(), 2);
        assert_eq!(found.results[0].id, "doc3");
        assert_eq!(
            found.results[0].metadata["text"],
            "The Taj Mahal is located in Agra."
        );
    }

    #[tokio::test]
    async fn test_derived_id_collision_overwrites() {
        let rag = service();
        rag.create_index().unwrap();

        let a = rag.add_document("Mumbai is the financial capital of India.", None).await.unwrap();
        let b = rag.add_document("Mumbai is the financial hub of Maharashtra.", None).await.unwrap();
        assert_eq!(a.doc_id, b.doc_id);

        let index = rag.manager.get_index("test_index").unwrap();
        assert_eq!(index.len().unwrap(), 1);
        assert_eq!(
            index.get(&a.doc_id).unwrap().metadata["text"],
            "Mumbai is the financial hub of Maharashtra."
        );
    }

    #[tokio::test]
    async fn test_errors() {
        let rag = service();
        assert!(matches!(
            rag.search("anything", 3).await,
            Err(EngineError::NotFound { .. })
        ));
        rag.create_index().unwrap();
        assert!(matches!(
            rag.search("anything", 0).await,
            Err(EngineError::InvalidArgument { .. })
        ));
        assert!(matches!(
            rag.search("anything", -2).await,
            Err(EngineError::InvalidArgument { .. })
        ));
        assert!(matches!(
            rag.add_document("  ", None).await,
            Err(EngineError::InvalidArgument { .. })
        ));
    }
}
