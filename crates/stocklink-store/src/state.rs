//! # Pair Snapshot Store
//!
//! Durable map of reconciliation key → last observed `{side_a, side_b}`.
//!
//! ## Write Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   Atomic Snapshot Persistence                           │
//! │                                                                         │
//! │  save(snapshots)                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. serialize whole map (sorted by key)                                │
//! │  2. write  state.json.tmp                                              │
//! │  3. fsync  state.json.tmp                                              │
//! │  4. rename state.json.tmp → state.json   ← atomic on POSIX             │
//! │                                                                         │
//! │  A crash at any step leaves either the old or the new file intact.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! File format:
//! ```json
//! { "wf-1_mt-1": { "side_a": 7, "side_b": 10 } }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info};

use stocklink_core::{PairSnapshot, ReconciliationKey};

use crate::error::{StoreError, StoreResult};

/// All persisted snapshots, ordered by key.
pub type SnapshotMap = BTreeMap<ReconciliationKey, PairSnapshot>;

/// Loads and saves the full snapshot map.
pub trait SnapshotStore: Send + Sync {
    /// Returns an empty map when nothing has been persisted yet.
    fn load(&self) -> StoreResult<SnapshotMap>;

    /// Replaces the persisted map with `snapshots`.
    fn save(&self, snapshots: &SnapshotMap) -> StoreResult<()>;
}

/// JSON file store with write-then-rename replacement.
#[derive(Debug, Clone)]
pub struct JsonStateFile {
    path: PathBuf,
}

impl JsonStateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonStateFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for JsonStateFile {
    fn load(&self) -> StoreResult<SnapshotMap> {
        if !self.path.exists() {
            info!(path = ?self.path, "No state file yet, starting with empty snapshots");
            return Ok(SnapshotMap::new());
        }

        let contents =
            fs::read_to_string(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        if contents.trim().is_empty() {
            return Ok(SnapshotMap::new());
        }

        let snapshots: SnapshotMap =
            serde_json::from_str(&contents).map_err(|e| StoreError::corrupt(&self.path, e))?;

        info!(path = ?self.path, pairs = snapshots.len(), "Loaded pair snapshots");
        Ok(snapshots)
    }

    fn save(&self, snapshots: &SnapshotMap) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let json = serde_json::to_vec_pretty(snapshots)?;
        let tmp_path = self.tmp_path();

        let mut file = fs::File::create(&tmp_path).map_err(|e| StoreError::io(&tmp_path, e))?;
        file.write_all(&json)
            .and_then(|_| file.sync_all())
            .map_err(|e| StoreError::io(&tmp_path, e))?;
        drop(file);

        fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::io(&self.path, e))?;

        debug!(path = ?self.path, pairs = snapshots.len(), "Pair snapshots saved");
        Ok(())
    }
}

/// In-memory store (for testing).
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    data: Mutex<SnapshotMap>,
    saves: Mutex<usize>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store as if a previous process had saved `snapshots`.
    pub fn with_snapshots(snapshots: SnapshotMap) -> Self {
        InMemoryStateStore {
            data: Mutex::new(snapshots),
            saves: Mutex::new(0),
        }
    }

    /// Number of completed saves.
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or(0)
    }
}

impl SnapshotStore for InMemoryStateStore {
    fn load(&self) -> StoreResult<SnapshotMap> {
        let data = self.data.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(data.clone())
    }

    fn save(&self, snapshots: &SnapshotMap) -> StoreResult<()> {
        let mut data = self.data.lock().map_err(|_| StoreError::LockPoisoned)?;
        *data = snapshots.clone();
        *self.saves.lock().map_err(|_| StoreError::LockPoisoned)? += 1;
        Ok(())
    }
}
