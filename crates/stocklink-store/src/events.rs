//! # Event Log
//!
//! Append-only JSON Lines log of sync events. One line per [`SyncEvent`].

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use stocklink_core::SyncEvent;

use crate::error::{StoreError, StoreResult};

/// Destination for sync events.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &SyncEvent) -> StoreResult<()>;
}

/// JSON Lines file, opened in append mode for every record.
#[derive(Debug)]
pub struct JsonlEventLog {
    path: PathBuf,
    // Serializes writers so lines never interleave.
    write_lock: Mutex<()>,
}

impl JsonlEventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonlEventLog {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for JsonlEventLog {
    fn record(&self, event: &SyncEvent) -> StoreResult<()> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let _guard = self.write_lock.lock().map_err(|_| StoreError::LockPoisoned)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::io(&self.path, e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| StoreError::io(&self.path, e))
    }
}

/// Keeps events in memory (for testing).
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<SyncEvent>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl EventSink for MemoryEventLog {
    fn record(&self, event: &SyncEvent) -> StoreResult<()> {
        self.events
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?
            .push(event.clone());
        Ok(())
    }
}
