//! # Sync State
//!
//! The engine's only mutable state, owned explicitly and passed into each
//! pass by reference.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         SyncState                                       │
//! │                                                                         │
//! │   snapshots: key → { side_a, side_b }    persisted via SnapshotStore   │
//! │   throttle:  key → last attempt Instant  memory only                   │
//! │                                                                         │
//! │   load(store) ──► passes mutate via record() ──► save(store)           │
//! │                   failed pairs: touch_throttle() only                  │
//! │                   (once per completed cycle)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The throttle is keyed by pair, not by direction, so a pair handled by the
//! restock pass is skipped by the sale pass in the same cycle.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use stocklink_core::{PairSnapshot, ReconciliationKey};
use stocklink_store::{SnapshotMap, SnapshotStore};

use crate::error::SyncResult;

/// Per-pair minimum interval between attempts.
#[derive(Debug, Clone)]
pub struct SyncThrottle {
    window: Duration,
    last_attempt: HashMap<ReconciliationKey, Instant>,
}

impl SyncThrottle {
    pub fn new(window: Duration) -> Self {
        SyncThrottle {
            window,
            last_attempt: HashMap::new(),
        }
    }

    /// Returns true if the pair was touched less than one window ago.
    pub fn is_throttled(&self, key: &ReconciliationKey) -> bool {
        self.last_attempt
            .get(key)
            .map(|at| at.elapsed() < self.window)
            .unwrap_or(false)
    }

    pub fn touch(&mut self, key: &ReconciliationKey) {
        self.last_attempt.insert(key.clone(), Instant::now());
    }
}

/// Snapshots plus throttle, with an explicit load/save lifecycle.
#[derive(Debug, Clone)]
pub struct SyncState {
    snapshots: SnapshotMap,
    throttle: SyncThrottle,
}

impl SyncState {
    pub fn new(throttle_window: Duration) -> Self {
        SyncState {
            snapshots: SnapshotMap::new(),
            throttle: SyncThrottle::new(throttle_window),
        }
    }

    /// Loads persisted snapshots. The throttle always starts empty.
    pub fn load(store: &dyn SnapshotStore, throttle_window: Duration) -> SyncResult<Self> {
        let snapshots = store.load()?;
        debug!(pairs = snapshots.len(), "Loaded sync state");
        Ok(SyncState {
            snapshots,
            throttle: SyncThrottle::new(throttle_window),
        })
    }

    pub fn save(&self, store: &dyn SnapshotStore) -> SyncResult<()> {
        store.save(&self.snapshots)?;
        debug!(pairs = self.snapshots.len(), "Saved sync state");
        Ok(())
    }

    pub fn snapshot(&self, key: &ReconciliationKey) -> Option<PairSnapshot> {
        self.snapshots.get(key).copied()
    }

    pub fn is_throttled(&self, key: &ReconciliationKey) -> bool {
        self.throttle.is_throttled(key)
    }

    /// Replaces the pair's snapshot and restarts its throttle window.
    pub fn record(&mut self, key: &ReconciliationKey, snapshot: PairSnapshot) {
        self.snapshots.insert(key.clone(), snapshot);
        self.throttle.touch(key);
    }

    /// Restarts the pair's throttle window and leaves its snapshot alone.
    /// Used when a sync attempt failed.
    pub fn touch_throttle(&mut self, key: &ReconciliationKey) {
        self.throttle.touch(key);
    }

    pub fn snapshots(&self) -> &SnapshotMap {
        &self.snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stocklink_core::MappingEntry;
    use stocklink_store::InMemoryStateStore;

    fn key() -> ReconciliationKey {
        MappingEntry::new("wf-1", "mt-1").key()
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_window_elapses() {
        let mut throttle = SyncThrottle::new(Duration::from_secs(60));
        let key = key();

        assert!(!throttle.is_throttled(&key));
        throttle.touch(&key);
        assert!(throttle.is_throttled(&key));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(throttle.is_throttled(&key));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!throttle.is_throttled(&key));
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_replaces_snapshot_and_throttles() {
        let mut state = SyncState::new(Duration::from_secs(60));
        let key = key();

        state.record(&key, PairSnapshot::new(10, 10));
        state.record(&key, PairSnapshot::new(7, 10));

        assert_eq!(state.snapshot(&key), Some(PairSnapshot::new(7, 10)));
        assert!(state.is_throttled(&key));
    }

    #[tokio::test(start_paused = true)]
    async fn test_touch_throttle_keeps_snapshot() {
        let mut state = SyncState::new(Duration::from_secs(60));
        let key = key();
        state.record(&key, PairSnapshot::new(10, 10));

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(!state.is_throttled(&key));

        state.touch_throttle(&key);
        assert!(state.is_throttled(&key));
        assert_eq!(state.snapshot(&key), Some(PairSnapshot::new(10, 10)));

        let mut fresh = SyncState::new(Duration::from_secs(60));
        fresh.touch_throttle(&key);
        assert!(fresh.is_throttled(&key));
        assert_eq!(fresh.snapshot(&key), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_save_round_trip_skips_throttle() {
        let store = InMemoryStateStore::new();
        let mut state = SyncState::new(Duration::from_secs(60));
        state.record(&key(), PairSnapshot::new(4, 5));
        state.save(&store).unwrap();

        let reloaded = SyncState::load(&store, Duration::from_secs(60)).unwrap();
        assert_eq!(reloaded.snapshot(&key()), Some(PairSnapshot::new(4, 5)));
        assert!(!reloaded.is_throttled(&key()));
    }
}
