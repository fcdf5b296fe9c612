//! Webflow CMS / ecommerce inventory client.
//!
//! Collection items are listed with offset/limit pagination; each item's
//! inventory is a sub-resource that supports an absolute set.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use stocklink_core::Quantity;

use super::pagination::OffsetPage;
use super::{check_status, InventoryType, ItemInventory, SideBClient, WebflowItem};
use crate::config::{Secret, SyncConfig};
use crate::error::{SyncError, SyncResult};

const SERVICE: &str = "webflow";

/// HTTP client for the Webflow v2 API, scoped to one collection.
pub struct WebflowClient {
    client: Client,
    base_url: String,
    token: Secret,
    collection_id: String,
    page_size: u32,
}

impl WebflowClient {
    pub fn new(config: &SyncConfig) -> SyncResult<Self> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;

        Ok(WebflowClient {
            client,
            base_url: config.webflow.base_url.trim_end_matches('/').to_string(),
            token: config.webflow.api_token.clone(),
            collection_id: config.webflow.collection_id.clone(),
            page_size: config.webflow.page_size,
        })
    }

    fn items_url(&self) -> String {
        format!("{}/collections/{}/items", self.base_url, self.collection_id)
    }

    fn inventory_url(&self, item_id: &str) -> String {
        format!("{}/{}/inventory", self.items_url(), item_id)
    }
}

#[async_trait]
impl SideBClient for WebflowClient {
    fn page_limit(&self) -> u32 {
        self.page_size
    }

    async fn fetch_item_page(&self, offset: u64, limit: u32) -> SyncResult<OffsetPage<WebflowItem>> {
        let response = self
            .client
            .get(self.items_url())
            .bearer_auth(self.token.expose())
            .query(&[("offset", offset), ("limit", u64::from(limit))])
            .send()
            .await?;
        let response = check_status(SERVICE, &self.collection_id, response).await?;
        let body: ItemListResponse = response.json().await.map_err(malformed)?;
        Ok(body.into_page())
    }

    async fn fetch_quantity(&self, item_id: &str) -> SyncResult<ItemInventory> {
        let response = self
            .client
            .get(self.inventory_url(item_id))
            .bearer_auth(self.token.expose())
            .send()
            .await?;
        let response = check_status(SERVICE, item_id, response).await?;
        let body: InventoryResponse = response.json().await.map_err(malformed)?;
        let inventory = body.into_inventory()?;

        if inventory.inventory_type == InventoryType::Infinite {
            warn!(item_id, quantity = inventory.quantity, "Webflow item has infinite inventory");
        }
        Ok(inventory)
    }

    async fn set_quantity(&self, item_id: &str, quantity: Quantity) -> SyncResult<()> {
        let request = SetInventoryRequest {
            inventory_type: InventoryType::Finite,
            quantity,
        };
        let response = self
            .client
            .patch(self.inventory_url(item_id))
            .bearer_auth(self.token.expose())
            .json(&request)
            .send()
            .await?;
        check_status(SERVICE, item_id, response).await?;
        Ok(())
    }
}

fn malformed(err: reqwest::Error) -> SyncError {
    SyncError::malformed(SERVICE, err.to_string())
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct ItemListResponse {
    #[serde(default)]
    items: Vec<ItemResource>,
    #[serde(default)]
    pagination: Option<ItemPagination>,
}

impl ItemListResponse {
    fn into_page(self) -> OffsetPage<WebflowItem> {
        OffsetPage {
            total: self.pagination.and_then(|p| p.total),
            items: self
                .items
                .into_iter()
                .map(|item| WebflowItem { id: item.id })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ItemPagination {
    #[serde(default)]
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ItemResource {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InventoryResponse {
    #[serde(default)]
    quantity: Option<Quantity>,
    #[serde(default)]
    inventory_type: InventoryType,
}

impl InventoryResponse {
    fn into_inventory(self) -> SyncResult<ItemInventory> {
        let quantity = match (self.quantity, self.inventory_type) {
            (Some(q), _) => q,
            (None, InventoryType::Infinite) => 0,
            (None, InventoryType::Finite) => {
                return Err(SyncError::malformed(SERVICE, "inventory has no quantity"))
            }
        };
        Ok(ItemInventory {
            quantity,
            inventory_type: self.inventory_type,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SetInventoryRequest {
    inventory_type: InventoryType,
    quantity: Quantity,
}
