//! # stocklink-core: Pure Reconciliation Logic
//!
//! Everything in this crate is deterministic: the same inputs always produce
//! the same outputs, and nothing here touches the network or the filesystem.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stocklink Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 apps/daemon (`stocklink` binary)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        stocklink-sync (clients, retry, engine, scheduler)       │   │
//! │  └──────────────┬──────────────────────────────────┬───────────────┘   │
//! │                 │                                  │                    │
//! │  ┌──────────────▼──────────────┐                   │                    │
//! │  │ stocklink-store (files)     │                   │                    │
//! │  └──────────────┬──────────────┘                   │                    │
//! │                 │                                  │                    │
//! │  ┌──────────────▼──────────────────────────────────▼───────────────┐   │
//! │  │               ★ stocklink-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │ quantity  │  │ reconcile │  │   event   │  │   │
//! │  │   │ Mapping   │  │ override  │  │ restock / │  │ SyncEvent │  │   │
//! │  │   │ Snapshot  │  │ tree scan │  │ sale plan │  │ statuses  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Mapping entries, reconciliation keys, snapshots, observations
//! - [`quantity`] - Quantity extraction from Mariana Tek override trees
//! - [`reconcile`] - Restock and sale decisions
//! - [`event`] - Event log records
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use stocklink_core::{plan_restock, PairSnapshot, RestockAction};
//!
//! let previous = PairSnapshot::new(10, 10);
//! let observed = PairSnapshot::new(7, 10);
//!
//! assert_eq!(plan_restock(Some(previous), observed), RestockAction::SetSideB(7));
//! ```

pub mod error;
pub mod event;
pub mod quantity;
pub mod reconcile;
pub mod types;

pub use error::{CoreError, CoreResult};
pub use event::{EventCategory, EventStatus, SyncEvent};
pub use quantity::{extract_quantity, Extraction, LocationOverride, RegionOverride, VariantInventory};
pub use reconcile::{plan_restock, plan_sale, RestockAction, SaleAction};
pub use types::*;
