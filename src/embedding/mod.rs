//! Text embedding: turns documents and questions into vectors.
//!
//! The model is external to this crate. [`TrigramEmbedder`] is a
//! deterministic offline stand-in; [`HttpEmbedder`] calls an
//! Ollama-compatible embedding server.

pub mod http;
pub mod trigram;

pub use http::HttpEmbedder;
pub use trigram::TrigramEmbedder;

use crate::error::{EngineError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Produces fixed-length vectors from text.
#[async_trait]
pub trait Embedder: Send + Sync + std::fmt::Debug {
    /// Provider name, e.g. "trigram" or "http"
    fn name(&self) -> &str;

    /// Length of every vector this embedder returns.
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Which embedder the service uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    Trigram,
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub kind: EmbedderKind,
    pub dimension: usize,
    /// Base URL of the embedding server (http only)
    pub url: String,
    /// Model name sent to the embedding server (http only)
    pub model: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            kind: EmbedderKind::Trigram,
            dimension: 384,
            url: "http://localhost:11434".to_string(),
            model: "all-minilm".to_string(),
        }
    }
}

pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    if config.dimension == 0 {
        return Err(EngineError::invalid("embedding dimension must be positive"));
    }
    Ok(match config.kind {
        EmbedderKind::Trigram => Arc::new(TrigramEmbedder::new(config.dimension)),
        EmbedderKind::Http => Arc::new(HttpEmbedder::new(
            config.url.clone(),
            config.model.clone(),
            config.dimension,
        )?),
    })
}
