//! Named indices and the operations callers run against them.
//!
//! The registry and every index sit behind their own `RwLock`: mutations
//! of one index take its write lock, reads take the read lock, and no
//! operation ever holds two index locks for writing.

use crate::error::{EngineError, Result};
use crate::persistence::serialization::{IndexSnapshot, SerializedRecord, StoreSnapshot};
use crate::schema::IndexConfig;
use crate::storage::{QueryResult, VectorRecord, VectorStore};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Summary of one index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexInfo {
    pub name: String,
    #[serde(flatten)]
    pub config: IndexConfig,
    pub count: usize,
}

/// Shared handle to a named index.
///
/// A handle outlives `delete_index`: it keeps working on its own records
/// but is no longer reachable through the manager.
#[derive(Debug)]
pub struct IndexHandle {
    name: String,
    store: RwLock<VectorStore>,
}

impl IndexHandle {
    fn new(name: String, store: VectorStore) -> Self {
        Self {
            name,
            store: RwLock::new(store),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> Result<IndexConfig> {
        Ok(self.store.read()?.config().clone())
    }

    pub fn info(&self) -> Result<IndexInfo> {
        let store = self.store.read()?;
        Ok(IndexInfo {
            name: self.name.clone(),
            config: store.config().clone(),
            count: store.len(),
        })
    }

    /// Insert-or-replace records in order; see [`VectorStore::upsert`].
    pub fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize> {
        let mut store = self.store.write()?;
        let applied = store.upsert(records)?;
        debug!(index = %self.name, applied, "upserted records");
        Ok(applied)
    }

    pub fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<QueryResult>> {
        self.store.read()?.query(vector, top_k)
    }

    pub fn get(&self, id: &str) -> Result<VectorRecord> {
        self.store.read()?.get(id)
    }

    pub fn delete(&self, id: &str) -> Result<VectorRecord> {
        let record = self.store.write()?.delete(id)?;
        debug!(index = %self.name, id, "deleted record");
        Ok(record)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.store.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn list_ids(&self) -> Result<Vec<String>> {
        Ok(self.store.read()?.list_ids())
    }
}

/// Owner of every named index.
#[derive(Debug, Default)]
pub struct IndexManager {
    indices: RwLock<BTreeMap<String, Arc<IndexHandle>>>,
}

impl IndexManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new empty index.
    pub fn create_index(&self, name: &str, config: IndexConfig) -> Result<Arc<IndexHandle>> {
        if name.trim().is_empty() {
            return Err(EngineError::invalid("index name must not be empty"));
        }
        config.validate()?;

        let mut indices = self.indices.write()?;
        if indices.contains_key(name) {
            return Err(EngineError::AlreadyExists {
                name: name.to_string(),
            });
        }
        let handle = Arc::new(IndexHandle::new(name.to_string(), VectorStore::new(config.clone())));
        indices.insert(name.to_string(), Arc::clone(&handle));
        info!(
            index = name,
            dimension = config.dimension,
            space_type = %config.space_type,
            precision = %config.precision,
            "created index"
        );
        Ok(handle)
    }

    pub fn get_index(&self, name: &str) -> Result<Arc<IndexHandle>> {
        self.indices
            .read()?
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::index_not_found(name))
    }

    /// Registered names, sorted ascending.
    pub fn list_indexes(&self) -> Result<Vec<String>> {
        Ok(self.indices.read()?.keys().cloned().collect())
    }

    pub fn delete_index(&self, name: &str) -> Result<()> {
        self.indices
            .write()?
            .remove(name)
            .ok_or_else(|| EngineError::index_not_found(name))?;
        info!(index = name, "deleted index");
        Ok(())
    }

    /// Point-in-time copy of every index.
    ///
    /// All index read locks are held together while copying, so no write
    /// to any index lands part-way through.
    pub fn snapshot(&self) -> Result<StoreSnapshot> {
        let registry = self.indices.read()?;
        let guards = registry
            .values()
            .map(|handle| Ok((handle.name.clone(), handle.store.read()?)))
            .collect::<Result<Vec<_>>>()?;

        let indices = guards
            .iter()
            .map(|(name, store)| {
                let records = store
                    .records()?
                    .iter()
                    .map(SerializedRecord::from_record)
                    .collect::<Result<Vec<_>>>()?;
                Ok(IndexSnapshot {
                    name: name.clone(),
                    config: store.config().clone(),
                    records,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(StoreSnapshot { indices })
    }

    /// Replace every index with the contents of `snapshot`.
    ///
    /// The new store is built completely before it is swapped in; on error
    /// the current store is left untouched.
    pub fn restore(&self, snapshot: StoreSnapshot) -> Result<()> {
        let mut rebuilt = BTreeMap::new();
        for index in snapshot.indices {
            index.config.validate()?;
            if rebuilt.contains_key(&index.name) {
                return Err(EngineError::AlreadyExists { name: index.name });
            }
            let mut store = VectorStore::new(index.config);
            let records = index
                .records
                .into_iter()
                .map(SerializedRecord::into_record)
                .collect::<Result<Vec<_>>>()?;
            store.upsert(records)?;
            rebuilt.insert(index.name.clone(), Arc::new(IndexHandle::new(index.name, store)));
        }

        let count = rebuilt.len();
        *self.indices.write()? = rebuilt;
        info!(indices = count, "restored store from snapshot");
        Ok(())
    }
}
