//! # stocklink-sync: Reconciliation Engine for Stocklink
//!
//! Keeps Mariana Tek (booking platform) and Webflow (storefront) inventory in
//! step by polling both sides and pushing only what changed since the last
//! recorded snapshot.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Reconciliation Architecture                        │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                SyncScheduler (non-overlapping loop)              │  │
//! │  │                                                                  │  │
//! │  │  Spawned as a Tokio task by the daemon                          │  │
//! │  │  One cycle at a time, first cycle immediately                   │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │                               ▼                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                    ReconciliationEngine                          │  │
//! │  │                                                                  │  │
//! │  │  RESTOCK pass: Mariana Tek ──(absolute set)──► Webflow          │  │
//! │  │  SALE pass:    Webflow ──(relative adjust)──► Mariana Tek       │  │
//! │  └───────┬─────────────────────┬─────────────────────┬──────────────┘  │
//! │          ▼                     ▼                     ▼                  │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ SyncState      │  │ ResilientCaller│  │ Remote clients         │    │
//! │  │                │  │                │  │                        │    │
//! │  │ snapshots +    │  │ 429/500 retry  │  │ MarianaTekClient       │    │
//! │  │ per-pair       │  │ Retry-After    │  │ WebflowClient          │    │
//! │  │ throttle       │  │ correlation id │  │ (paginated listings)   │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  EVENT LOG (JSON Lines): RESTOCK / SALE / SYSTEM                        │
//! │  SUCCESS • ERROR • RETRY • WARNING • INFO                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`clients`] - Remote system contracts, HTTP clients, pagination
//! - [`config`] - Service configuration (TOML + environment)
//! - [`engine`] - Restock and sale passes, cycle reports
//! - [`error`] - Sync error types
//! - [`recorder`] - Event log writer mirrored to tracing
//! - [`retry`] - Bounded retry wrapper for remote calls
//! - [`scheduler`] - Periodic cycle runner and its handle
//! - [`state`] - Snapshots and throttle

pub mod clients;
pub mod config;
pub mod engine;
pub mod error;
pub mod recorder;
pub mod retry;
pub mod scheduler;
pub mod state;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use clients::{
    InventoryType, ItemInventory, MarianaTekClient, MarianaTekVariant, SideAClient, SideBClient,
    WebflowClient, WebflowItem,
};
pub use config::{MarianaTekSettings, PathSettings, Secret, SyncConfig, SyncSettings, WebflowSettings};
pub use engine::{CycleReport, EngineOptions, PassReport, ReconciliationEngine, ReconciliationEngineBuilder};
pub use error::{SyncError, SyncResult};
pub use recorder::EventRecorder;
pub use retry::{ResilientCaller, RetryPolicy};
pub use scheduler::{SchedulerHandle, SchedulerStatus, SyncScheduler};
pub use state::{SyncState, SyncThrottle};
