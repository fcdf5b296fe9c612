//! # Sync Scheduler
//!
//! Drives the engine on a fixed interval without ever overlapping cycles.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Scheduler Loop                                     │
//! │                                                                         │
//! │   spawn() ──► tick (immediate) ──► run_cycle ──► update status         │
//! │                  ▲                     │                                │
//! │                  │                     │ cycle awaited inline, so the   │
//! │                  │                     │ next tick cannot start early   │
//! │                  └──── interval ◄──────┘ (missed ticks are delayed)     │
//! │                                                                         │
//! │   shutdown() ──► in-flight cycle finishes and persists ──► loop exits  │
//! │                                                                         │
//! │   Cycle errors are recorded as SYSTEM events; the loop keeps going.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use stocklink_core::EventCategory;

use crate::engine::{CycleReport, ReconciliationEngine};
use crate::error::{SyncError, SyncResult};
use crate::state::SyncState;

// =============================================================================
// Scheduler Status
// =============================================================================

/// Current scheduler status for external queries.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStatus {
    /// Whether the loop is still running.
    pub running: bool,

    /// Cycles that finished, with or without pass failures.
    pub cycles_completed: u64,

    /// Cycles that ended in a cycle-level error.
    pub cycles_failed: u64,

    /// Report of the most recent completed cycle.
    pub last_report: Option<CycleReport>,

    /// Most recent cycle-level error.
    pub last_error: Option<String>,
}

// =============================================================================
// Scheduler
// =============================================================================

/// Periodic, non-overlapping cycle runner.
pub struct SyncScheduler {
    engine: ReconciliationEngine,
    interval: Duration,
}

impl SyncScheduler {
    pub fn new(engine: ReconciliationEngine, interval: Duration) -> Self {
        SyncScheduler { engine, interval }
    }

    /// Starts the loop on the current runtime. The first cycle runs at once.
    pub fn spawn(self, state: SyncState) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let status = Arc::new(RwLock::new(SchedulerStatus {
            running: true,
            ..Default::default()
        }));

        let task = tokio::spawn(self.run(state, status.clone(), shutdown_rx));

        SchedulerHandle {
            shutdown_tx,
            status,
            task,
        }
    }

    async fn run(
        self,
        mut state: SyncState,
        status: Arc<RwLock<SchedulerStatus>>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) -> SyncState {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = self.interval.as_secs(), "Sync scheduler started");
        self.engine.events().info(
            EventCategory::System,
            "scheduler",
            format!("Scheduler started, interval {}s", self.interval.as_secs()),
        );

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    info!("Sync scheduler received shutdown");
                    break;
                }

                _ = ticker.tick() => {
                    let result = self.engine.run_cycle(&mut state).await;

                    let mut s = status.write().await;
                    match result {
                        Ok(report) => {
                            s.cycles_completed += 1;
                            s.last_report = Some(report);
                        }
                        Err(e) => {
                            error!(error = %e, "Sync cycle failed");
                            s.cycles_failed += 1;
                            s.last_error = Some(e.to_string());
                        }
                    }
                }
            }
        }

        status.write().await.running = false;
        self.engine
            .events()
            .info(EventCategory::System, "scheduler", "Scheduler stopped");
        info!("Sync scheduler stopped");
        state
    }
}

// =============================================================================
// Scheduler Handle (for external control)
// =============================================================================

/// Handle for controlling a running scheduler.
pub struct SchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
    status: Arc<RwLock<SchedulerStatus>>,
    task: JoinHandle<SyncState>,
}

impl SchedulerHandle {
    /// Gets the current scheduler status.
    pub async fn status(&self) -> SchedulerStatus {
        self.status.read().await.clone()
    }

    /// Signals shutdown and waits for the in-flight cycle to finish.
    ///
    /// Returns the final in-memory state.
    pub async fn shutdown(self) -> SyncResult<SyncState> {
        let _ = self.shutdown_tx.send(()).await;
        self.task
            .await
            .map_err(|e| SyncError::Internal(format!("scheduler task failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineOptions;
    use crate::testing::{FakeMarianaTek, FakeWebflow};
    use stocklink_core::{MappingEntry, MappingSet, PairSnapshot};
    use stocklink_store::{
        InMemoryStateStore, MappingSource, MemoryEventLog, StaticMapping, StoreError, StoreResult,
    };

    fn engine(
        side_a: Arc<FakeMarianaTek>,
        side_b: Arc<FakeWebflow>,
        mappings: Arc<dyn MappingSource>,
        store: Arc<InMemoryStateStore>,
    ) -> ReconciliationEngine {
        ReconciliationEngine::builder(EngineOptions {
            default_location_id: "48".into(),
            request_delay: Duration::ZERO,
            page_delay: Duration::ZERO,
            throttle_window: Duration::from_secs(60),
            dry_run: false,
        })
        .side_a(side_a)
        .side_b(side_b)
        .mappings(mappings)
        .snapshots(store)
        .events(Arc::new(MemoryEventLog::new()))
        .build()
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_cycle_runs_immediately_then_on_interval() {
        let side_a = Arc::new(FakeMarianaTek::new());
        let side_b = Arc::new(FakeWebflow::new());
        side_a.set("mt-1", 10);
        side_b.set("wf-1", 10);
        let store = Arc::new(InMemoryStateStore::new());
        let mapping = Arc::new(StaticMapping::new(vec![MappingEntry::new("wf-1", "mt-1")]));

        let engine = engine(side_a.clone(), side_b.clone(), mapping, store.clone());
        let state = engine.load_state().unwrap();
        let handle = SyncScheduler::new(engine, Duration::from_secs(300)).spawn(state);

        tokio::time::sleep(Duration::from_millis(1)).await;
        let status = handle.status().await;
        assert!(status.running);
        assert_eq!(status.cycles_completed, 1);
        assert_eq!(store.save_count(), 1);

        side_a.set("mt-1", 4);
        tokio::time::sleep(Duration::from_secs(300)).await;
        let status = handle.status().await;
        assert_eq!(status.cycles_completed, 2);
        assert_eq!(status.last_report.map(|r| r.restock.pushed), Some(1));
        assert_eq!(side_b.sets(), vec![("wf-1".to_string(), 4)]);

        let state = handle.shutdown().await.unwrap();
        let key = MappingEntry::new("wf-1", "mt-1").key();
        assert_eq!(state.snapshot(&key), Some(PairSnapshot::new(4, 10)));
    }

    struct FlakyMapping;

    impl MappingSource for FlakyMapping {
        fn load(&self) -> StoreResult<MappingSet> {
            Err(StoreError::MappingNotFound("mapping.json".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_errors_do_not_stop_the_loop() {
        let engine = engine(
            Arc::new(FakeMarianaTek::new()),
            Arc::new(FakeWebflow::new()),
            Arc::new(FlakyMapping),
            Arc::new(InMemoryStateStore::new()),
        );
        let state = engine.load_state().unwrap();
        let handle = SyncScheduler::new(engine, Duration::from_secs(10)).spawn(state);

        tokio::time::sleep(Duration::from_secs(25)).await;
        let status = handle.status().await;
        assert_eq!(status.cycles_failed, 3);
        assert_eq!(status.cycles_completed, 0);
        assert!(status.last_error.is_some());
        assert!(status.running);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_scheduler() {
        let engine = engine(
            Arc::new(FakeMarianaTek::new()),
            Arc::new(FakeWebflow::new()),
            Arc::new(StaticMapping::default()),
            Arc::new(InMemoryStateStore::new()),
        );
        let state = engine.load_state().unwrap();
        let handle = SyncScheduler::new(engine, Duration::from_secs(10)).spawn(state);
        let status = handle.status.clone();

        tokio::time::sleep(Duration::from_millis(1)).await;
        handle.shutdown().await.unwrap();

        assert!(!status.read().await.running);
    }
}
