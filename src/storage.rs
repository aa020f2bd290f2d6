//! In-memory record storage for a single index

use crate::error::{EngineError, Result};
use crate::index::Index;
use crate::schema::IndexConfig;
use crate::vector::{StoredVector, Vector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata associated with a record; opaque to the engine.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A record as written by and returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    #[serde(default, alias = "meta")]
    pub metadata: Metadata,
}

impl VectorRecord {
    pub fn new(id: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            vector,
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A query hit: record id, score per the index space type, and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub id: String,
    pub score: f32,
    pub metadata: Metadata,
}

/// Records of one index, searched through a pluggable [`Index`].
///
/// The index owns the encoded vectors; the store owns the id mapping and
/// metadata. Internal IDs increase monotonically, so they double as the
/// insertion sequence used for tie-breaking. Replacing a record assigns it
/// a fresh internal ID.
#[derive(Debug)]
pub struct VectorStore {
    config: IndexConfig,
    index: Box<dyn Index>,
    /// String ID -> usize internal ID
    id_to_internal: HashMap<String, usize>,
    /// usize internal ID -> String ID
    internal_to_id: HashMap<usize, String>,
    /// Metadata keyed by internal ID
    metadata: HashMap<usize, Metadata>,
    /// Next internal ID to assign
    next_id: usize,
}

impl VectorStore {
    /// Create an empty store for a validated config.
    pub fn new(config: IndexConfig) -> Self {
        let index = config.backend.build(config.space_type);
        Self {
            config,
            index,
            id_to_internal: HashMap::new(),
            internal_to_id: HashMap::new(),
            metadata: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    fn check_vector(&self, data: &[f32]) -> Result<()> {
        if data.len() != self.config.dimension {
            return Err(EngineError::DimensionMismatch {
                expected: self.config.dimension,
                actual: data.len(),
            });
        }
        if data.iter().any(|x| !x.is_finite()) {
            return Err(EngineError::invalid("vector components must be finite"));
        }
        Ok(())
    }

    /// Insert or replace a single record. On error the store is unchanged.
    pub fn upsert_record(&mut self, record: VectorRecord) -> Result<()> {
        if record.id.is_empty() {
            return Err(EngineError::invalid("record id must not be empty"));
        }
        self.check_vector(&record.vector)?;

        let stored = StoredVector::encode(&Vector::new(record.vector), self.config.precision);
        let internal_id = self.next_id;
        self.index.add(internal_id, stored)?;
        self.next_id += 1;

        if let Some(old_internal) = self.id_to_internal.insert(record.id.clone(), internal_id) {
            self.index.remove(old_internal);
            self.metadata.remove(&old_internal);
            self.internal_to_id.remove(&old_internal);
        }
        self.internal_to_id.insert(internal_id, record.id);
        self.metadata.insert(internal_id, record.metadata);

        Ok(())
    }

    /// Apply records in order. The first failing record stops the batch and
    /// its error is returned; records before it stay applied.
    pub fn upsert(&mut self, records: Vec<VectorRecord>) -> Result<usize> {
        let mut applied = 0;
        for record in records {
            self.upsert_record(record)?;
            applied += 1;
        }
        Ok(applied)
    }

    fn record_at(&self, internal_id: usize, id: &str) -> Result<VectorRecord> {
        let vector = self
            .index
            .get_vector(internal_id)
            .ok_or_else(|| EngineError::Internal(format!("record {} has no vector", id)))?;
        Ok(VectorRecord {
            id: id.to_string(),
            vector: vector.to_vec(),
            metadata: self.metadata.get(&internal_id).cloned().unwrap_or_default(),
        })
    }

    /// Get a record by ID
    pub fn get(&self, id: &str) -> Result<VectorRecord> {
        let &internal_id = self
            .id_to_internal
            .get(id)
            .ok_or_else(|| EngineError::record_not_found(id))?;
        self.record_at(internal_id, id)
    }

    /// Delete a record by ID, returning it
    pub fn delete(&mut self, id: &str) -> Result<VectorRecord> {
        let record = self.get(id)?;
        if let Some(internal_id) = self.id_to_internal.remove(id) {
            self.internal_to_id.remove(&internal_id);
            self.metadata.remove(&internal_id);
            self.index.remove(internal_id);
        }
        Ok(record)
    }

    /// Top-k records for `vector`, best first.
    pub fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryResult>> {
        self.check_vector(vector)?;
        if top_k == 0 {
            return Err(EngineError::invalid("top_k must be positive"));
        }
        if self.is_empty() {
            return Ok(vec![]);
        }

        let hits = self.index.search(&Vector::new(vector.to_vec()), top_k)?;

        Ok(hits
            .into_iter()
            .filter_map(|(internal_id, score)| {
                self.internal_to_id.get(&internal_id).map(|id| QueryResult {
                    id: id.clone(),
                    score,
                    metadata: self.metadata.get(&internal_id).cloned().unwrap_or_default(),
                })
            })
            .collect())
    }

    /// Get the number of records in the store
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn internal_ids_in_order(&self) -> Vec<usize> {
        let mut ids: Vec<usize> = self.internal_to_id.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// All record IDs in insertion order
    pub fn list_ids(&self) -> Vec<String> {
        self.internal_ids_in_order()
            .into_iter()
            .filter_map(|i| self.internal_to_id.get(&i).cloned())
            .collect()
    }

    /// All records in insertion order; re-inserting them in this order
    /// reproduces the tie-breaking sequence.
    pub fn records(&self) -> Result<Vec<VectorRecord>> {
        self.internal_ids_in_order()
            .into_iter()
            .map(|i| self.record_at(i, &self.internal_to_id[&i]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::SpaceType;
    use crate::vector::Precision;
    use approx::assert_relative_eq;

    fn store(dim: usize, space: SpaceType) -> VectorStore {
        VectorStore::new(IndexConfig::new(dim, space, Precision::Float32))
    }

    fn meta(text: &str) -> Metadata {
        let mut m = Metadata::new();
        m.insert("text".to_string(), serde_json::json!(text));
        m
    }

    #[test]
    fn test_upsert_and_get() {
        let mut store = store(3, SpaceType::Euclidean);
        let r = VectorRecord::new("v1", vec![1.0, 2.0, 3.0]).with_metadata(meta("hello"));
        store.upsert(vec![r.clone()]).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("v1").unwrap(), r);
    }

    #[test]
    fn test_dimension_enforced() {
        let mut store = store(3, SpaceType::Euclidean);
        store.upsert_record(VectorRecord::new("v1", vec![1.0, 2.0, 3.0])).unwrap();

        let result = store.upsert_record(VectorRecord::new("v2", vec![1.0, 2.0]));
        assert!(matches!(result, Err(EngineError::DimensionMismatch { expected: 3, actual: 2 })));
        assert_eq!(store.list_ids(), vec!["v1"]);
    }

    #[test]
    fn test_rejects_empty_id_and_nan() {
        let mut store = store(2, SpaceType::Cosine);
        assert!(matches!(
            store.upsert_record(VectorRecord::new("", vec![1.0, 0.0])),
            Err(EngineError::InvalidArgument { .. })
        ));
        assert!(matches!(
            store.upsert_record(VectorRecord::new("x", vec![f32::NAN, 0.0])),
            Err(EngineError::InvalidArgument { .. })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_replace_keeps_one_record() {
        let mut store = store(2, SpaceType::Cosine);
        store.upsert_record(VectorRecord::new("a", vec![1.0, 0.0])).unwrap();
        store
            .upsert_record(VectorRecord::new("a", vec![0.0, 1.0]).with_metadata(meta("new")))
            .unwrap();

        assert_eq!(store.len(), 1);
        let got = store.get("a").unwrap();
        assert_eq!(got.vector, vec![0.0, 1.0]);
        assert_eq!(got.metadata, meta("new"));
    }

    #[test]
    fn test_batch_stops_at_first_failure() {
        let mut store = store(2, SpaceType::Cosine);
        let result = store.upsert(vec![
            VectorRecord::new("a", vec![1.0, 0.0]),
            VectorRecord::new("b", vec![1.0]),
            VectorRecord::new("c", vec![0.0, 1.0]),
        ]);
        assert!(matches!(result, Err(EngineError::DimensionMismatch { .. })));
        assert_eq!(store.list_ids(), vec!["a"]);
    }

    #[test]
    fn test_delete() {
        let mut store = store(3, SpaceType::Euclidean);
        store.upsert_record(VectorRecord::new("v1", vec![1.0, 2.0, 3.0])).unwrap();

        let removed = store.delete("v1").unwrap();
        assert_eq!(removed.id, "v1");
        assert_eq!(store.len(), 0);
        assert!(matches!(store.delete("v1"), Err(EngineError::NotFound { .. })));
        assert!(matches!(store.get("v1"), Err(EngineError::NotFound { .. })));
    }

    #[test]
    fn test_query() {
        let mut store = store(3, SpaceType::Euclidean);
        store.upsert_record(VectorRecord::new("v1", vec![1.0, 0.0, 0.0])).unwrap();
        store.upsert_record(VectorRecord::new("v2", vec![0.0, 1.0, 0.0])).unwrap();
        store.upsert_record(VectorRecord::new("v3", vec![1.0, 1.0, 0.0])).unwrap();

        let results = store.query(&[1.0, 0.0, 0.0], 2).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "v1");
        assert_relative_eq!(results[0].score, 0.0, epsilon = 1e-6);
        assert_eq!(results[1].id, "v3");
    }

    #[test]
    fn test_query_validation() {
        let store = store(3, SpaceType::Cosine);
        assert!(matches!(
            store.query(&[1.0, 0.0], 1),
            Err(EngineError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            store.query(&[1.0, 0.0, 0.0], 0),
            Err(EngineError::InvalidArgument { .. })
        ));
        assert!(store.query(&[1.0, 0.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_replacement_moves_to_end_of_tie_order() {
        let mut store = store(2, SpaceType::DotProduct);
        store.upsert_record(VectorRecord::new("a", vec![1.0, 0.0])).unwrap();
        store.upsert_record(VectorRecord::new("b", vec![1.0, 0.0])).unwrap();
        store.upsert_record(VectorRecord::new("a", vec![1.0, 0.0])).unwrap();

        let ids: Vec<String> = store
            .query(&[1.0, 0.0], 2)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(store.list_ids(), vec!["b", "a"]);
    }

    #[test]
    fn test_float16_store() {
        let mut store = VectorStore::new(IndexConfig::new(2, SpaceType::Cosine, Precision::Float16));
        store.upsert_record(VectorRecord::new("h", vec![0.1, 0.5])).unwrap();
        let got = store.get("h").unwrap();
        assert_relative_eq!(got.vector[0], 0.1, epsilon = 1e-3);
        assert_eq!(got.vector[1], 0.5);
    }
}
