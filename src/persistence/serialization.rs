//! Serialization utilities: bincode for snapshots, JSON for metadata and manifests.

use crate::error::{EngineError, Result};
use crate::schema::IndexConfig;
use crate::storage::{Metadata, VectorRecord};
use serde::{Deserialize, Serialize};

/// A stored record in snapshot form.
///
/// Metadata travels as a JSON string: bincode cannot decode the
/// self-describing `serde_json::Value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedRecord {
    pub id: String,
    pub data: Vec<f32>,
    pub metadata_json: String,
}

impl SerializedRecord {
    pub fn from_record(record: &VectorRecord) -> Result<Self> {
        Ok(Self {
            id: record.id.clone(),
            data: record.vector.clone(),
            metadata_json: String::from_utf8(to_json(&record.metadata)?)
                .map_err(|e| EngineError::SerializationError(e.to_string()))?,
        })
    }

    pub fn into_record(self) -> Result<VectorRecord> {
        let metadata: Metadata = from_json(self.metadata_json.as_bytes())?;
        Ok(VectorRecord {
            id: self.id,
            vector: self.data,
            metadata,
        })
    }
}

/// One index: schema plus records in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub name: String,
    pub config: IndexConfig,
    pub records: Vec<SerializedRecord>,
}

/// Every index of a manager at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StoreSnapshot {
    pub indices: Vec<IndexSnapshot>,
}

impl StoreSnapshot {
    pub fn record_count(&self) -> usize {
        self.indices.iter().map(|i| i.records.len()).sum()
    }
}

/// Encode data to bincode bytes.
pub fn to_bincode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| EngineError::SerializationError(e.to_string()))
}

/// Decode data from bincode bytes.
pub fn from_bincode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| EngineError::SerializationError(e.to_string()))
}

/// Encode data to JSON bytes.
pub fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| EngineError::SerializationError(e.to_string()))
}

/// Decode data from JSON bytes.
pub fn from_json<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| EngineError::SerializationError(e.to_string()))
}
