//! # Store Error Types
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  std::io::Error / serde_json::Error / CoreError                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (this module) ← Adds the offending path                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SyncError::Persistence (sync crate) ← Cycle-level failure             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use thiserror::Error;

use stocklink_core::CoreError;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing a file failed.
    ///
    /// ## When This Occurs
    /// - Missing directory permissions
    /// - Disk full during the temp-file write
    /// - Rename across filesystems
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file exists but does not contain the expected JSON.
    #[error("Corrupt file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Serializing in-memory data failed.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The mapping file parsed but an entry is invalid.
    #[error(transparent)]
    InvalidMapping(#[from] CoreError),

    /// The mapping file is missing.
    #[error("Mapping file not found: {0}")]
    MappingNotFound(PathBuf),

    /// A lock guarding in-memory data was poisoned.
    #[error("Lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        StoreError::Corrupt {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
