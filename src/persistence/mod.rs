//! Persistence layer: point-in-time snapshots of the whole store.

pub mod serialization;
pub mod snapshot;

pub use serialization::{IndexSnapshot, SerializedRecord, StoreSnapshot};
pub use snapshot::SnapshotManager;
