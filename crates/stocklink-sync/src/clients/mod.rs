//! # Remote Clients
//!
//! Contracts for the two remote systems plus their HTTP implementations.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SideAClient (Mariana Tek)           SideBClient (Webflow)             │
//! │  ─────────────────────────           ─────────────────────             │
//! │  fetch_variant_page(n) paged by #    fetch_item_page(offset)  + limit  │
//! │  fetch_variant(id)                   fetch_quantity(id)                │
//! │  adjust_quantity(id, Δ, location)    set_quantity(id, n)  absolute     │
//! │  (relative only)                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Implementations report failures as [`SyncError`] so the retry wrapper can
//! classify them; they never retry on their own. Listings are exposed one
//! page at a time so a retried page does not restart the whole listing.

pub mod marianatek;
pub mod pagination;
pub mod webflow;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};

use stocklink_core::{Quantity, VariantInventory};

use crate::error::{SyncError, SyncResult};

pub use marianatek::MarianaTekClient;
pub use pagination::{NumberedPage, OffsetPage};
pub use webflow::WebflowClient;

// =============================================================================
// Entities
// =============================================================================

/// A Mariana Tek product variant with its inventory attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct MarianaTekVariant {
    pub id: String,
    pub inventory: VariantInventory,
}

/// A Webflow collection item (one product SKU).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebflowItem {
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryType {
    #[default]
    Finite,
    Infinite,
}

/// Inventory sub-resource of a Webflow item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemInventory {
    pub quantity: Quantity,
    pub inventory_type: InventoryType,
}

impl ItemInventory {
    pub fn finite(quantity: Quantity) -> Self {
        ItemInventory {
            quantity,
            inventory_type: InventoryType::Finite,
        }
    }
}

// =============================================================================
// Contracts
// =============================================================================

/// Mariana Tek: the booking platform, authoritative for restocks.
#[async_trait]
pub trait SideAClient: Send + Sync {
    /// One page of the variant listing, numbered from 1.
    async fn fetch_variant_page(&self, page: u32) -> SyncResult<NumberedPage<MarianaTekVariant>>;

    async fn fetch_variant(&self, variant_id: &str) -> SyncResult<MarianaTekVariant>;

    /// Relative adjustment; Mariana Tek has no absolute set.
    async fn adjust_quantity(&self, variant_id: &str, delta: i64, location_id: &str)
        -> SyncResult<()>;
}

/// Webflow: the storefront, authoritative for sales.
#[async_trait]
pub trait SideBClient: Send + Sync {
    /// Page size used for the item listing.
    fn page_limit(&self) -> u32;

    /// Up to `limit` collection items starting at `offset`.
    async fn fetch_item_page(&self, offset: u64, limit: u32) -> SyncResult<OffsetPage<WebflowItem>>;

    async fn fetch_quantity(&self, item_id: &str) -> SyncResult<ItemInventory>;

    /// Absolute set. Always sent as finite inventory.
    async fn set_quantity(&self, item_id: &str, quantity: Quantity) -> SyncResult<()>;
}

// =============================================================================
// Response Handling
// =============================================================================

/// Passes successful responses through and maps everything else to a
/// classified [`SyncError`].
pub(crate) async fn check_status(
    service: &'static str,
    resource: &str,
    response: Response,
) -> SyncResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after);

    let err = match status {
        StatusCode::TOO_MANY_REQUESTS => SyncError::RateLimited {
            service,
            retry_after,
        },
        StatusCode::INTERNAL_SERVER_ERROR => SyncError::TransientServer {
            service,
            retry_after,
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SyncError::Unauthorized {
            service,
            status: status.as_u16(),
        },
        StatusCode::NOT_FOUND => SyncError::NotFound {
            service,
            resource: resource.to_string(),
        },
        _ => SyncError::RemoteRejected {
            service,
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        },
    };
    Err(err)
}

/// Parses a Retry-After value given in seconds.
///
/// HTTP-date values are not supported and yield `None`.
pub(crate) fn parse_retry_after(value: &str) -> Option<Duration> {
    let secs: f64 = value.trim().parse().ok()?;
    if secs.is_finite() && secs >= 0.0 {
        Some(Duration::from_secs_f64(secs))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after("2"), Some(Duration::from_secs(2)));
        assert_eq!(parse_retry_after(" 1.5 "), Some(Duration::from_millis(1500)));
        assert_eq!(parse_retry_after("-1"), None);
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[test]
    fn test_inventory_type_wire_format() {
        assert_eq!(serde_json::to_string(&InventoryType::Finite).unwrap(), "\"finite\"");
        let parsed: InventoryType = serde_json::from_str("\"infinite\"").unwrap();
        assert_eq!(parsed, InventoryType::Infinite);
    }
}
