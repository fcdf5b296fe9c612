//! # stocklink-store: Persistence Layer
//!
//! File-backed stores used by the reconciliation engine:
//!
//! - [`state`] - pair snapshots, rewritten atomically at the end of each cycle
//! - [`events`] - append-only JSON Lines event log
//! - [`mapping`] - the mapping file, reloaded every cycle
//!
//! Each store sits behind a trait so the engine can run against in-memory
//! implementations in tests.

pub mod error;
pub mod events;
pub mod mapping;
pub mod state;

pub use error::{StoreError, StoreResult};
pub use events::{EventSink, JsonlEventLog, MemoryEventLog};
pub use mapping::{JsonMappingFile, MappingSource, StaticMapping};
pub use state::{InMemoryStateStore, JsonStateFile, SnapshotMap, SnapshotStore};
