//! # Quantity Extraction
//!
//! Derives the current stock level of a Mariana Tek variant from its
//! inventory override tree.
//!
//! ## Override Tree
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   VariantInventory (attributes)                         │
//! │                                                                         │
//! │  inventory_overrides                                                   │
//! │   ├── region r1                                                        │
//! │   │    ├── location l1   quantity_present: null                        │
//! │   │    └── location l2   quantity_present: 4     ◄── FIRST MATCH WINS  │
//! │   └── region r2                                                        │
//! │        └── location l3   quantity_present: 9     (never reached)       │
//! │                                                                         │
//! │  quantity_present: 12                            ◄── flat fallback     │
//! │                                                                         │
//! │  SCAN ORDER: depth-first, regions then locations, document order.      │
//! │  No override number  → FallbackUsed(flat)                              │
//! │  No flat number      → Defaulted (0)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The scan does not filter by the configured default location and does not
//! sum across locations. Multi-location deployments may read a quantity that
//! belongs to a different location than the one adjusted by the sale pass.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::Quantity;

/// Inventory-related attributes of a Mariana Tek variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantInventory {
    #[serde(default, rename = "inventory_overrides")]
    pub regions: Option<Vec<RegionOverride>>,

    /// Flat quantity, used when no override carries a number.
    #[serde(default, rename = "quantity_present")]
    pub present_quantity: Option<Value>,
}

/// One region in the override tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionOverride {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub locations: Option<Vec<LocationOverride>>,
}

/// One location inside a region.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationOverride {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default, rename = "quantity_present")]
    pub present_quantity: Option<Value>,
}

/// Tagged result of [`extract_quantity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// A location override carried a number.
    FoundOverride {
        value: Quantity,
        region_id: Option<String>,
        location_id: Option<String>,
    },
    /// No override carried a number; the flat field did.
    FallbackUsed(Quantity),
    /// Nothing carried a number.
    Defaulted,
}

impl Extraction {
    pub fn quantity(&self) -> Quantity {
        match self {
            Extraction::FoundOverride { value, .. } => *value,
            Extraction::FallbackUsed(value) => *value,
            Extraction::Defaulted => 0,
        }
    }
}

/// Scans the override tree depth-first and returns the first numeric quantity.
pub fn extract_quantity(inventory: &VariantInventory) -> Extraction {
    for region in inventory.regions.iter().flatten() {
        for location in region.locations.iter().flatten() {
            if let Some(value) = location.present_quantity.as_ref().and_then(as_quantity) {
                return Extraction::FoundOverride {
                    value,
                    region_id: region.id.clone(),
                    location_id: location.id.clone(),
                };
            }
        }
    }

    match inventory.present_quantity.as_ref().and_then(as_quantity) {
        Some(value) => Extraction::FallbackUsed(value),
        None => Extraction::Defaulted,
    }
}

/// Interprets a JSON value as a stock quantity.
///
/// Only JSON numbers count. Fractions truncate toward zero, negatives clamp to zero.
fn as_quantity(value: &Value) -> Option<Quantity> {
    let number = value.as_number()?;
    if let Some(n) = number.as_u64() {
        return Some(n);
    }
    if number.as_i64().is_some() {
        return Some(0);
    }
    number.as_f64().map(|f| if f <= 0.0 { 0 } else { f.trunc() as Quantity })
}
