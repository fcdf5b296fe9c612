//! # Domain Types
//!
//! Types shared by the store, the remote clients and the reconciliation engine.
//!
//! ## Type Relationships
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────────┐  key()   ┌─────────────────────┐              │
//! │  │    MappingEntry     │ ───────► │  ReconciliationKey  │              │
//! │  │  ─────────────────  │          │  ─────────────────  │              │
//! │  │  webflow_variant_id │          │  "{wf}_{mt}"        │              │
//! │  │  marianatek_var_id  │          └──────────┬──────────┘              │
//! │  │  location_id?       │                     │ indexes                  │
//! │  └─────────────────────┘                     ▼                          │
//! │                                   ┌─────────────────────┐              │
//! │     quantities fetched   observed │    PairSnapshot     │              │
//! │     from both sides    ─────────► │  ─────────────────  │              │
//! │                                   │  side_a (MT qty)    │              │
//! │                                   │  side_b (WF qty)    │              │
//! │                                   └─────────────────────┘              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Side A is Mariana Tek (authoritative for restocks), side B is Webflow
//! (authoritative for sales).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};

/// Stock quantity. Never negative.
pub type Quantity = u64;

// =============================================================================
// Mapping
// =============================================================================

/// Declared correspondence between a Webflow item and a Mariana Tek variant.
///
/// Serialized with the camelCase field names used by the mapping file:
/// ```json
/// { "webflowVariantId": "wf-1", "marianatekVariantId": "mt-1", "locationId": "48" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingEntry {
    pub webflow_variant_id: String,
    pub marianatek_variant_id: String,
    /// Location to adjust on Mariana Tek. Falls back to the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
}

impl MappingEntry {
    pub fn new(
        webflow_variant_id: impl Into<String>,
        marianatek_variant_id: impl Into<String>,
    ) -> Self {
        MappingEntry {
            webflow_variant_id: webflow_variant_id.into(),
            marianatek_variant_id: marianatek_variant_id.into(),
            location_id: None,
        }
    }

    /// Pins this mapping to a specific Mariana Tek location.
    pub fn with_location(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = Some(location_id.into());
        self
    }

    /// Derives the reconciliation key for this pair.
    pub fn key(&self) -> ReconciliationKey {
        ReconciliationKey(format!(
            "{}_{}",
            self.webflow_variant_id, self.marianatek_variant_id
        ))
    }

    /// Resolves the location to adjust, preferring the pinned one.
    pub fn location_or<'a>(&'a self, default_location: &'a str) -> &'a str {
        match self.location_id.as_deref() {
            Some(loc) if !loc.trim().is_empty() => loc,
            _ => default_location,
        }
    }

    fn validate(&self, index: usize) -> CoreResult<()> {
        if self.webflow_variant_id.trim().is_empty() {
            return Err(CoreError::invalid_mapping(index, "webflowVariantId is empty"));
        }
        if self.marianatek_variant_id.trim().is_empty() {
            return Err(CoreError::invalid_mapping(index, "marianatekVariantId is empty"));
        }
        Ok(())
    }
}

/// Uniquely identifies one synchronized pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReconciliationKey(String);

impl ReconciliationKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReconciliationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lookup tables over an ordered list of mapping entries.
///
/// Built once per cycle. Only entries present here are ever reconciled.
#[derive(Debug, Clone, Default)]
pub struct MappingSet {
    entries: Vec<MappingEntry>,
    by_marianatek: HashMap<String, usize>,
    by_webflow: HashMap<String, usize>,
}

/// Outcome of building a [`MappingSet`].
#[derive(Debug, Clone, Default)]
pub struct MappingBuild {
    pub set: MappingSet,
    /// Keys that appeared more than once; the first occurrence was kept.
    pub duplicates: Vec<ReconciliationKey>,
}

impl MappingSet {
    /// Validates entries and indexes them by both ids.
    ///
    /// The first entry wins when an id or key repeats.
    pub fn build(entries: Vec<MappingEntry>) -> CoreResult<MappingBuild> {
        let mut set = MappingSet::default();
        let mut duplicates = Vec::new();
        let mut seen_keys = std::collections::HashSet::new();

        for (index, entry) in entries.into_iter().enumerate() {
            entry.validate(index)?;

            let key = entry.key();
            if !seen_keys.insert(key.clone())
                || set.by_marianatek.contains_key(&entry.marianatek_variant_id)
                || set.by_webflow.contains_key(&entry.webflow_variant_id)
            {
                duplicates.push(key);
                continue;
            }

            let position = set.entries.len();
            set.by_marianatek
                .insert(entry.marianatek_variant_id.clone(), position);
            set.by_webflow.insert(entry.webflow_variant_id.clone(), position);
            set.entries.push(entry);
        }

        Ok(MappingBuild { set, duplicates })
    }

    pub fn for_marianatek(&self, variant_id: &str) -> Option<&MappingEntry> {
        self.by_marianatek.get(variant_id).map(|&i| &self.entries[i])
    }

    pub fn for_webflow(&self, item_id: &str) -> Option<&MappingEntry> {
        self.by_webflow.get(item_id).map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Snapshots
// =============================================================================

/// Last recorded quantities for one pair, one per side.
///
/// Replaced wholesale every time the pair is processed; never merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairSnapshot {
    /// Mariana Tek quantity.
    pub side_a: Quantity,
    /// Webflow quantity.
    pub side_b: Quantity,
}

impl PairSnapshot {
    pub const fn new(side_a: Quantity, side_b: Quantity) -> Self {
        PairSnapshot { side_a, side_b }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_deterministic() {
        let a = MappingEntry::new("wf-1", "mt-9");
        let b = MappingEntry::new("wf-1", "mt-9").with_location("48");
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().as_str(), "wf-1_mt-9");
    }

    #[test]
    fn test_location_fallback() {
        let pinned = MappingEntry::new("wf", "mt").with_location("7");
        let unpinned = MappingEntry::new("wf", "mt");
        let blank = MappingEntry::new("wf", "mt").with_location("  ");

        assert_eq!(pinned.location_or("1"), "7");
        assert_eq!(unpinned.location_or("1"), "1");
        assert_eq!(blank.location_or("1"), "1");
    }

    #[test]
    fn test_mapping_file_format() {
        let json = r#"[
            {"webflowVariantId": "wf-1", "marianatekVariantId": "mt-1"},
            {"webflowVariantId": "wf-2", "marianatekVariantId": "mt-2", "locationId": "48"}
        ]"#;
        let entries: Vec<MappingEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries[0].location_id, None);
        assert_eq!(entries[1].location_id.as_deref(), Some("48"));
    }

    #[test]
    fn test_mapping_set_lookup() {
        let build = MappingSet::build(vec![
            MappingEntry::new("wf-1", "mt-1"),
            MappingEntry::new("wf-2", "mt-2"),
        ])
        .unwrap();

        assert!(build.duplicates.is_empty());
        assert_eq!(build.set.len(), 2);
        assert_eq!(
            build.set.for_marianatek("mt-2").map(|e| e.webflow_variant_id.as_str()),
            Some("wf-2")
        );
        assert_eq!(
            build.set.for_webflow("wf-1").map(|e| e.marianatek_variant_id.as_str()),
            Some("mt-1")
        );
        assert!(build.set.for_webflow("wf-3").is_none());
    }

    #[test]
    fn test_mapping_set_keeps_first_duplicate() {
        let build = MappingSet::build(vec![
            MappingEntry::new("wf-1", "mt-1").with_location("first"),
            MappingEntry::new("wf-1", "mt-1").with_location("second"),
        ])
        .unwrap();

        assert_eq!(build.set.len(), 1);
        assert_eq!(build.duplicates.len(), 1);
        assert_eq!(
            build.set.for_webflow("wf-1").and_then(|e| e.location_id.as_deref()),
            Some("first")
        );
    }

    #[test]
    fn test_mapping_set_rejects_empty_ids() {
        let err = MappingSet::build(vec![
            MappingEntry::new("wf-1", "mt-1"),
            MappingEntry::new("", "mt-2"),
        ])
        .unwrap_err();
        assert_eq!(err, CoreError::invalid_mapping(1, "webflowVariantId is empty"));
    }
}
