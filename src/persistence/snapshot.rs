//! Snapshot: save/load full store state to/from disk.
//!
//! `snapshot.bin` is `[crc32: u32 LE][payload: bincode(StoreSnapshot)]`.
//! The payload is written to a temporary file and renamed into place, so a
//! crash mid-save leaves the previous snapshot intact. Saves through one
//! manager (and its clones) are serialized.

use crate::error::{EngineError, Result};
use crate::persistence::serialization::{self, StoreSnapshot};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::info;

const CHECKSUM_LEN: usize = 4;

/// Distinguishes temporary files of concurrent saves.
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Manages saving and loading store snapshots in one directory.
#[derive(Debug, Clone)]
pub struct SnapshotManager {
    dir: PathBuf,
    /// Held for the whole of a save, shared by clones.
    save_lock: Arc<Mutex<()>>,
}

impl SnapshotManager {
    /// Create a snapshot manager for the given directory.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            save_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn snapshot_path(&self) -> PathBuf {
        self.dir.join("snapshot.bin")
    }

    fn manifest_path(&self) -> PathBuf {
        self.dir.join("manifest.json")
    }

    /// Save a store snapshot to disk.
    pub fn save(&self, snapshot: &StoreSnapshot) -> Result<()> {
        let _guard = self.save_lock.lock()?;
        self.write(snapshot)
    }

    /// Take a snapshot with `capture` and save it, both under the save lock,
    /// so a later capture is never overwritten by an earlier one. Returns the
    /// number of records saved.
    pub fn capture_and_save<F>(&self, capture: F) -> Result<usize>
    where
        F: FnOnce() -> Result<StoreSnapshot>,
    {
        let _guard = self.save_lock.lock()?;
        let snapshot = capture()?;
        self.write(&snapshot)?;
        Ok(snapshot.record_count())
    }

    fn write(&self, snapshot: &StoreSnapshot) -> Result<()> {
        let payload = serialization::to_bincode(snapshot)?;
        let mut data = Vec::with_capacity(CHECKSUM_LEN + payload.len());
        data.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        data.extend_from_slice(&payload);

        let tmp = self.dir.join(format!(
            "snapshot.bin.{}.{}.tmp",
            std::process::id(),
            TMP_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&tmp, &data)?;
        fs::rename(&tmp, self.snapshot_path())?;

        // Human-readable summary next to the binary snapshot
        let manifest = serde_json::json!({
            "indices": snapshot.indices.iter().map(|i| serde_json::json!({
                "name": i.name,
                "dimension": i.config.dimension,
                "space_type": i.config.space_type,
                "precision": i.config.precision,
                "records": i.records.len(),
            })).collect::<Vec<_>>(),
            "record_count": snapshot.record_count(),
        });
        let manifest_bytes = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| EngineError::SerializationError(e.to_string()))?;
        fs::write(self.manifest_path(), &manifest_bytes)?;

        info!(
            path = %self.snapshot_path().display(),
            indices = snapshot.indices.len(),
            records = snapshot.record_count(),
            "saved snapshot"
        );
        Ok(())
    }

    /// Load the snapshot from disk, or None if none was saved yet.
    pub fn load(&self) -> Result<Option<StoreSnapshot>> {
        let path = self.snapshot_path();
        if !path.exists() {
            return Ok(None);
        }

        let data = fs::read(&path)?;
        if data.len() < CHECKSUM_LEN {
            return Err(EngineError::Corrupted("file shorter than checksum".to_string()));
        }
        let (crc_bytes, payload) = data.split_at(CHECKSUM_LEN);
        let mut expected = [0u8; CHECKSUM_LEN];
        expected.copy_from_slice(crc_bytes);
        if crc32fast::hash(payload) != u32::from_le_bytes(expected) {
            return Err(EngineError::Corrupted("checksum mismatch".to_string()));
        }

        let snapshot: StoreSnapshot = serialization::from_bincode(payload)?;
        Ok(Some(snapshot))
    }

    /// Check if a snapshot exists.
    pub fn exists(&self) -> bool {
        self.snapshot_path().exists()
    }
}
