//! # Reconciliation Engine
//!
//! Runs the two directional passes that make up one sync cycle.
//!
//! ## Cycle Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          run_cycle()                                    │
//! │                                                                         │
//! │  1. Reload mapping file ──────────────── failure aborts the cycle      │
//! │                                                                         │
//! │  2. RESTOCK PASS (Mariana Tek → Webflow)                               │
//! │     fetch all variants ───────────────── failure aborts this pass      │
//! │     for each mapped, unthrottled variant:                              │
//! │       A' = extract_quantity(variant)                                   │
//! │       B  = fetch Webflow quantity                                      │
//! │       A' ≠ recorded A  ──► set Webflow = A'                            │
//! │       record {A', B}, touch throttle   (failure: touch throttle only)  │
//! │                                                                         │
//! │  3. SALE PASS (Webflow → Mariana Tek)                                  │
//! │     fetch all items ──────────────────── failure aborts this pass      │
//! │     for each mapped, unthrottled item:                                 │
//! │       B' = fetch Webflow quantity,  A = fetch variant + extract        │
//! │       Δ = B' − recorded B  ≠ 0  ──► adjust Mariana Tek by Δ            │
//! │       record {A, B'}, touch throttle   (failure: touch throttle only)  │
//! │                                                                         │
//! │  4. Persist snapshots (write-then-rename)                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Listings are fetched page by page, each page under its own retry budget,
//! with `page_delay` between pages. Entities are processed one at a time with
//! `request_delay` after each. A failure on one entity is logged and the pass
//! moves on; the pair keeps its old snapshot but is still throttled.
//!
//! Neither push is idempotent. If the process dies after a push but before
//! the snapshot is persisted, the next cycle applies the same change again.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use stocklink_core::{
    extract_quantity, plan_restock, plan_sale, EventCategory, Extraction, MappingEntry,
    MappingSet, PairSnapshot, Quantity, RestockAction, SaleAction,
};
use stocklink_store::{EventSink, MappingSource, SnapshotStore};

use crate::clients::pagination::{collect_numbered, collect_offset};
use crate::clients::{MarianaTekVariant, SideAClient, SideBClient, WebflowItem};
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::recorder::EventRecorder;
use crate::retry::{ResilientCaller, RetryPolicy};
use crate::state::SyncState;

// =============================================================================
// Reports
// =============================================================================

/// Counters for one directional pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Pairs actually examined (mapped and not throttled).
    pub processed: usize,
    /// Pairs where a change was pushed (or would have been, in dry-run).
    pub pushed: usize,
    pub unchanged: usize,
    pub throttled: usize,
    pub unmapped: usize,
    pub failed: usize,
    /// Set when the listing fetch failed and no entity was examined.
    pub aborted: Option<String>,
}

impl std::fmt::Display for PassReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(reason) = &self.aborted {
            return write!(f, "aborted: {}", reason);
        }
        write!(
            f,
            "processed={} pushed={} unchanged={} throttled={} unmapped={} failed={}",
            self.processed, self.pushed, self.unchanged, self.throttled, self.unmapped, self.failed
        )
    }
}

/// Result of one full cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub restock: PassReport,
    pub sale: PassReport,
    pub duration: Duration,
    pub dry_run: bool,
}

impl CycleReport {
    /// True when neither pass aborted and no entity failed.
    pub fn is_clean(&self) -> bool {
        [&self.restock, &self.sale]
            .iter()
            .all(|pass| pass.aborted.is_none() && pass.failed == 0)
    }
}

enum PairOutcome {
    Pushed,
    Unchanged,
}

// =============================================================================
// Engine Options
// =============================================================================

/// Runtime knobs for the engine.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Mariana Tek location adjusted when a mapping pins none.
    pub default_location_id: String,
    pub request_delay: Duration,
    /// Pause between listing pages.
    pub page_delay: Duration,
    pub throttle_window: Duration,
    pub dry_run: bool,
}

impl EngineOptions {
    pub fn from_config(config: &SyncConfig) -> Self {
        EngineOptions {
            default_location_id: config.marianatek.default_location_id.clone(),
            request_delay: config.request_delay(),
            page_delay: config.page_delay(),
            throttle_window: config.throttle_window(),
            dry_run: config.sync.dry_run,
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Two-way inventory reconciliation between Mariana Tek and Webflow.
pub struct ReconciliationEngine {
    side_a: Arc<dyn SideAClient>,
    side_b: Arc<dyn SideBClient>,
    mappings: Arc<dyn MappingSource>,
    snapshots: Arc<dyn SnapshotStore>,
    events: EventRecorder,
    caller: ResilientCaller,
    options: EngineOptions,
}

impl ReconciliationEngine {
    pub fn builder(options: EngineOptions) -> ReconciliationEngineBuilder {
        ReconciliationEngineBuilder::new(options)
    }

    /// Loads persisted snapshots into a fresh state with an empty throttle.
    pub fn load_state(&self) -> SyncResult<SyncState> {
        SyncState::load(self.snapshots.as_ref(), self.options.throttle_window)
    }

    pub(crate) fn events(&self) -> &EventRecorder {
        &self.events
    }

    /// Runs one full cycle: restock pass, sale pass, then persist.
    ///
    /// Returns an error only for cycle-level failures (mapping or state
    /// file). Pass and entity failures are reported in the [`CycleReport`].
    pub async fn run_cycle(&self, state: &mut SyncState) -> SyncResult<CycleReport> {
        let started = tokio::time::Instant::now();

        match self.cycle_inner(state, started).await {
            Ok(report) => {
                self.events.info(
                    EventCategory::System,
                    "cycle",
                    format!(
                        "Cycle complete in {}ms: restock [{}] sale [{}]",
                        report.duration.as_millis(),
                        report.restock,
                        report.sale
                    ),
                );
                Ok(report)
            }
            Err(e) => {
                self.events
                    .failure(EventCategory::System, "cycle", format!("Cycle failed: {}", e));
                Err(e)
            }
        }
    }

    async fn cycle_inner(
        &self,
        state: &mut SyncState,
        started: tokio::time::Instant,
    ) -> SyncResult<CycleReport> {
        let mapping = self.mappings.load()?;
        if mapping.is_empty() {
            warn!("Mapping is empty, nothing to reconcile");
        }

        let restock = self.run_restock_pass(&mapping, state).await;
        let sale = self.run_sale_pass(&mapping, state).await;

        if self.options.dry_run {
            debug!("Dry run, state file left untouched");
        } else {
            state.save(self.snapshots.as_ref())?;
        }

        Ok(CycleReport {
            restock,
            sale,
            duration: started.elapsed(),
            dry_run: self.options.dry_run,
        })
    }

    // =========================================================================
    // Restock Pass (Mariana Tek → Webflow)
    // =========================================================================

    /// Propagates Mariana Tek quantity changes to Webflow as absolute sets.
    pub async fn run_restock_pass(&self, mapping: &MappingSet, state: &mut SyncState) -> PassReport {
        let mut report = PassReport::default();
        let category = EventCategory::Restock;

        let variants = match self.list_variants(category).await {
            Ok(variants) => variants,
            Err(e) => {
                self.events
                    .failure(category, "*", format!("Failed to fetch Mariana Tek variants: {}", e));
                report.aborted = Some(e.to_string());
                return report;
            }
        };

        for variant in &variants {
            let Some(entry) = mapping.for_marianatek(&variant.id) else {
                report.unmapped += 1;
                continue;
            };
            let key = entry.key();
            if state.is_throttled(&key) {
                report.throttled += 1;
                continue;
            }

            report.processed += 1;
            match self.restock_pair(entry, variant, state).await {
                Ok(PairOutcome::Pushed) => report.pushed += 1,
                Ok(PairOutcome::Unchanged) => report.unchanged += 1,
                Err(e) => {
                    report.failed += 1;
                    state.touch_throttle(&key);
                    self.events.failure(
                        category,
                        &variant.id,
                        format!("Restock sync failed for {}: {}", key, e),
                    );
                }
            }

            tokio::time::sleep(self.options.request_delay).await;
        }

        info!(%report, "Restock pass finished");
        report
    }

    async fn restock_pair(
        &self,
        entry: &MappingEntry,
        variant: &MarianaTekVariant,
        state: &mut SyncState,
    ) -> SyncResult<PairOutcome> {
        let category = EventCategory::Restock;
        let key = entry.key();
        let item_id = entry.webflow_variant_id.as_str();

        let new_a = self.quantity_of(category, variant);
        let current_b = self
            .caller
            .call(category, "webflow.fetch_quantity", item_id, || {
                self.side_b.fetch_quantity(item_id)
            })
            .await?
            .quantity;

        let observed = PairSnapshot::new(new_a, current_b);
        let outcome = match plan_restock(state.snapshot(&key), observed) {
            RestockAction::SetSideB(quantity) => {
                self.push_restock(&variant.id, item_id, quantity, current_b).await?;
                PairOutcome::Pushed
            }
            RestockAction::NoChange => {
                debug!(%key, quantity = new_a, "Mariana Tek quantity unchanged");
                PairOutcome::Unchanged
            }
        };

        state.record(&key, observed);
        Ok(outcome)
    }

    async fn push_restock(
        &self,
        variant_id: &str,
        item_id: &str,
        quantity: Quantity,
        previous_b: Quantity,
    ) -> SyncResult<()> {
        let category = EventCategory::Restock;

        if self.options.dry_run {
            self.events.info(
                category,
                variant_id,
                format!(
                    "[dry-run] Would set Webflow {} to {} (currently {})",
                    item_id, quantity, previous_b
                ),
            );
            return Ok(());
        }

        self.caller
            .call(category, "webflow.set_quantity", item_id, || {
                self.side_b.set_quantity(item_id, quantity)
            })
            .await?;
        self.events.success(
            category,
            variant_id,
            format!("Set Webflow {} to {} (was {})", item_id, quantity, previous_b),
        );
        Ok(())
    }

    // =========================================================================
    // Sale Pass (Webflow → Mariana Tek)
    // =========================================================================

    /// Propagates Webflow quantity changes to Mariana Tek as relative
    /// adjustments.
    pub async fn run_sale_pass(&self, mapping: &MappingSet, state: &mut SyncState) -> PassReport {
        let mut report = PassReport::default();
        let category = EventCategory::Sale;

        let items = match self.list_items(category).await {
            Ok(items) => items,
            Err(e) => {
                self.events
                    .failure(category, "*", format!("Failed to fetch Webflow items: {}", e));
                report.aborted = Some(e.to_string());
                return report;
            }
        };

        for item in &items {
            let Some(entry) = mapping.for_webflow(&item.id) else {
                report.unmapped += 1;
                continue;
            };
            let key = entry.key();
            if state.is_throttled(&key) {
                report.throttled += 1;
                continue;
            }

            report.processed += 1;
            match self.sale_pair(entry, state).await {
                Ok(PairOutcome::Pushed) => report.pushed += 1,
                Ok(PairOutcome::Unchanged) => report.unchanged += 1,
                Err(e) => {
                    report.failed += 1;
                    state.touch_throttle(&key);
                    self.events.failure(
                        category,
                        &item.id,
                        format!("Sale sync failed for {}: {}", key, e),
                    );
                }
            }

            tokio::time::sleep(self.options.request_delay).await;
        }

        info!(%report, "Sale pass finished");
        report
    }

    async fn sale_pair(&self, entry: &MappingEntry, state: &mut SyncState) -> SyncResult<PairOutcome> {
        let category = EventCategory::Sale;
        let key = entry.key();
        let item_id = entry.webflow_variant_id.as_str();
        let variant_id = entry.marianatek_variant_id.as_str();

        let current_b = self
            .caller
            .call(category, "webflow.fetch_quantity", item_id, || {
                self.side_b.fetch_quantity(item_id)
            })
            .await?
            .quantity;
        let variant = self
            .caller
            .call(category, "marianatek.fetch_variant", variant_id, || {
                self.side_a.fetch_variant(variant_id)
            })
            .await?;
        let current_a = self.quantity_of(category, &variant);

        let observed = PairSnapshot::new(current_a, current_b);
        let outcome = match plan_sale(state.snapshot(&key), observed) {
            SaleAction::AdjustSideA(delta) => {
                let location = entry.location_or(&self.options.default_location_id);
                self.push_sale(item_id, variant_id, delta, location).await?;
                PairOutcome::Pushed
            }
            SaleAction::NoChange => {
                debug!(%key, quantity = current_b, "Webflow quantity unchanged");
                PairOutcome::Unchanged
            }
        };

        state.record(&key, observed);
        Ok(outcome)
    }

    async fn push_sale(
        &self,
        item_id: &str,
        variant_id: &str,
        delta: i64,
        location: &str,
    ) -> SyncResult<()> {
        let category = EventCategory::Sale;

        if self.options.dry_run {
            self.events.info(
                category,
                item_id,
                format!(
                    "[dry-run] Would adjust Mariana Tek {} by {:+} at location {}",
                    variant_id, delta, location
                ),
            );
            return Ok(());
        }

        self.caller
            .call(category, "marianatek.adjust_quantity", variant_id, || {
                self.side_a.adjust_quantity(variant_id, delta, location)
            })
            .await?;
        self.events.success(
            category,
            item_id,
            format!(
                "Adjusted Mariana Tek {} by {:+} at location {}",
                variant_id, delta, location
            ),
        );
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Every Mariana Tek variant. Each page is retried on its own.
    async fn list_variants(&self, category: EventCategory) -> SyncResult<Vec<MarianaTekVariant>> {
        let variants = collect_numbered("marianatek", self.options.page_delay, move |page| {
            self.caller
                .call(category, "marianatek.fetch_variant_page", "*", move || {
                    self.side_a.fetch_variant_page(page)
                })
        })
        .await?;
        debug!(count = variants.len(), "Fetched Mariana Tek variants");
        Ok(variants)
    }

    /// Every Webflow item in the collection. Each page is retried on its own.
    async fn list_items(&self, category: EventCategory) -> SyncResult<Vec<WebflowItem>> {
        let limit = self.side_b.page_limit();
        let items = collect_offset("webflow", limit, self.options.page_delay, move |offset, limit| {
            self.caller
                .call(category, "webflow.fetch_item_page", "*", move || {
                    self.side_b.fetch_item_page(offset, limit)
                })
        })
        .await?;
        debug!(count = items.len(), "Fetched Webflow items");
        Ok(items)
    }

    /// Extracts the variant's quantity, recording a warning when no location
    /// override carried one.
    fn quantity_of(&self, category: EventCategory, variant: &MarianaTekVariant) -> Quantity {
        let extraction = extract_quantity(&variant.inventory);
        match &extraction {
            Extraction::FoundOverride {
                region_id,
                location_id,
                ..
            } => {
                debug!(
                    variant = %variant.id,
                    region = region_id.as_deref().unwrap_or("-"),
                    location = location_id.as_deref().unwrap_or("-"),
                    "Using location override quantity"
                );
            }
            Extraction::FallbackUsed(value) => self.events.warning(
                category,
                &variant.id,
                format!("No location override quantity, using quantity_present ({})", value),
            ),
            Extraction::Defaulted => self.events.warning(
                category,
                &variant.id,
                "No quantity found on variant, assuming 0",
            ),
        }
        extraction.quantity()
    }
}

// =============================================================================
// Builder Pattern
// =============================================================================

/// Builder for [`ReconciliationEngine`].
pub struct ReconciliationEngineBuilder {
    options: EngineOptions,
    retry_policy: RetryPolicy,
    side_a: Option<Arc<dyn SideAClient>>,
    side_b: Option<Arc<dyn SideBClient>>,
    mappings: Option<Arc<dyn MappingSource>>,
    snapshots: Option<Arc<dyn SnapshotStore>>,
    events: Option<Arc<dyn EventSink>>,
}

impl ReconciliationEngineBuilder {
    pub fn new(options: EngineOptions) -> Self {
        ReconciliationEngineBuilder {
            options,
            retry_policy: RetryPolicy::default(),
            side_a: None,
            side_b: None,
            mappings: None,
            snapshots: None,
            events: None,
        }
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn side_a(mut self, client: Arc<dyn SideAClient>) -> Self {
        self.side_a = Some(client);
        self
    }

    pub fn side_b(mut self, client: Arc<dyn SideBClient>) -> Self {
        self.side_b = Some(client);
        self
    }

    pub fn mappings(mut self, source: Arc<dyn MappingSource>) -> Self {
        self.mappings = Some(source);
        self
    }

    pub fn snapshots(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.snapshots = Some(store);
        self
    }

    pub fn events(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    pub fn build(self) -> SyncResult<ReconciliationEngine> {
        let missing = |what: &str| SyncError::InvalidConfig(format!("{} required", what));

        let events = EventRecorder::new(self.events.ok_or_else(|| missing("Event sink"))?);
        Ok(ReconciliationEngine {
            side_a: self.side_a.ok_or_else(|| missing("Mariana Tek client"))?,
            side_b: self.side_b.ok_or_else(|| missing("Webflow client"))?,
            mappings: self.mappings.ok_or_else(|| missing("Mapping source"))?,
            snapshots: self.snapshots.ok_or_else(|| missing("Snapshot store"))?,
            caller: ResilientCaller::new(self.retry_policy, events.clone()),
            events,
            options: self.options,
        })
    }
}
