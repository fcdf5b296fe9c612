//! # Reconciliation Decisions
//!
//! Pure decision functions for the two directional passes. The engine does the
//! I/O; these functions decide what (if anything) to push.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Direction Asymmetry                                 │
//! │                                                                         │
//! │  RESTOCK (Mariana Tek → Webflow)     SALE (Webflow → Mariana Tek)      │
//! │  ───────────────────────────────     ────────────────────────────      │
//! │  compare new A vs recorded A         delta = current B − recorded B    │
//! │  push ABSOLUTE set of B = new A      push RELATIVE adjust of A by Δ    │
//! │                                                                         │
//! │  Webflow exposes absolute set;       Mariana Tek only exposes          │
//! │  Mariana Tek quantity is truth.      relative adjustments.             │
//! │                                                                         │
//! │  No prior snapshot → baseline = observed pair → first cycle is a no-op │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::types::{PairSnapshot, Quantity};

/// What the restock pass should do for one pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestockAction {
    /// Set the Webflow quantity to this absolute value.
    SetSideB(Quantity),
    NoChange,
}

/// What the sale pass should do for one pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleAction {
    /// Adjust the Mariana Tek quantity by this signed amount.
    AdjustSideA(i64),
    NoChange,
}

/// Decides whether a Mariana Tek restock must be pushed to Webflow.
pub fn plan_restock(previous: Option<PairSnapshot>, observed: PairSnapshot) -> RestockAction {
    let baseline = previous.unwrap_or(observed);
    if observed.side_a != baseline.side_a {
        RestockAction::SetSideB(observed.side_a)
    } else {
        RestockAction::NoChange
    }
}

/// Decides how much of a Webflow change must be applied to Mariana Tek.
pub fn plan_sale(previous: Option<PairSnapshot>, observed: PairSnapshot) -> SaleAction {
    let baseline = previous.unwrap_or(observed);
    let delta = signed_delta(baseline.side_b, observed.side_b);
    if delta != 0 {
        SaleAction::AdjustSideA(delta)
    } else {
        SaleAction::NoChange
    }
}

fn signed_delta(previous: Quantity, current: Quantity) -> i64 {
    if current >= previous {
        i64::try_from(current - previous).unwrap_or(i64::MAX)
    } else {
        i64::try_from(previous - current).map(|d| -d).unwrap_or(i64::MIN)
    }
}
