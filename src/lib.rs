//! # ragdb
//!
//! A small retrieval-augmented-generation service on top of an in-process
//! vector index engine.
//!
//! This library provides:
//! - Named indices with a fixed dimension, space type and precision
//! - Insert-or-replace records with opaque JSON metadata
//! - Exact (flat) and approximate (HNSW) top-k similarity search
//! - Snapshot persistence
//! - A RAG front end that embeds documents and questions, served over HTTP
//!
//! ## Example
//!
//! ```rust
//! use ragdb::{IndexConfig, IndexManager, Precision, SpaceType, VectorRecord};
//!
//! let manager = IndexManager::new();
//! let index = manager
//!     .create_index("docs", IndexConfig::new(2, SpaceType::Cosine, Precision::Float32))
//!     .unwrap();
//!
//! index
//!     .upsert(vec![
//!         VectorRecord::new("1", vec![1.0, 0.0]),
//!         VectorRecord::new("2", vec![0.0, 1.0]),
//!     ])
//!     .unwrap();
//!
//! let results = index.query(&[1.0, 0.0], 1).unwrap();
//! assert_eq!(results[0].id, "1");
//! ```

pub mod config;
pub mod distance;
pub mod embedding;
pub mod error;
pub mod flat_index;
pub mod hnsw;
pub mod index;
pub mod logging;
pub mod manager;
pub mod metrics;
pub mod persistence;
pub mod rag;
pub mod schema;
pub mod server;
pub mod storage;
pub mod vector;

pub use distance::SpaceType;
pub use error::{EngineError, ErrorKind, Result};
pub use flat_index::FlatIndex;
pub use hnsw::{HnswIndex, HnswParams};
pub use index::Index;
pub use manager::{IndexHandle, IndexInfo, IndexManager};
pub use metrics::MetricsCollector;
pub use persistence::{SnapshotManager, StoreSnapshot};
pub use rag::RagService;
pub use schema::{IndexBackend, IndexConfig};
pub use storage::{Metadata, QueryResult, VectorRecord, VectorStore};
pub use vector::{Precision, StoredVector, Vector};
