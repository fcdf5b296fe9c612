//! Mariana Tek admin API client.
//!
//! Variants are listed with page-number pagination:
//!
//! ```json
//! {
//!   "data": [{ "id": "1201", "attributes": { "inventory_overrides": [...], "quantity_present": 4 } }],
//!   "meta": { "pagination": { "page": 1, "pages": 3, "count": 120 } }
//! }
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use stocklink_core::VariantInventory;

use super::pagination::NumberedPage;
use super::{check_status, MarianaTekVariant, SideAClient};
use crate::config::{Secret, SyncConfig};
use crate::error::{SyncError, SyncResult};

const SERVICE: &str = "marianatek";

/// HTTP client for the Mariana Tek admin API.
pub struct MarianaTekClient {
    client: Client,
    base_url: String,
    token: Secret,
    page_size: u32,
}

impl MarianaTekClient {
    pub fn new(config: &SyncConfig) -> SyncResult<Self> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;

        Ok(MarianaTekClient {
            client,
            base_url: config.marianatek.base_url.trim_end_matches('/').to_string(),
            token: config.marianatek.api_token.clone(),
            page_size: config.marianatek.page_size,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }
}

#[async_trait]
impl SideAClient for MarianaTekClient {
    async fn fetch_variant_page(&self, page: u32) -> SyncResult<NumberedPage<MarianaTekVariant>> {
        let response = self
            .client
            .get(self.url("/product_variants"))
            .bearer_auth(self.token.expose())
            .query(&[("page", page), ("page_size", self.page_size)])
            .send()
            .await?;
        let response = check_status(SERVICE, "product_variants", response).await?;
        let body: VariantListResponse = response.json().await.map_err(malformed)?;
        Ok(body.into_page())
    }

    async fn fetch_variant(&self, variant_id: &str) -> SyncResult<MarianaTekVariant> {
        let response = self
            .client
            .get(self.url(&format!("/product_variants/{}", variant_id)))
            .bearer_auth(self.token.expose())
            .send()
            .await?;
        let response = check_status(SERVICE, variant_id, response).await?;
        let body: VariantResponse = response.json().await.map_err(malformed)?;
        Ok(body.data.into())
    }

    async fn adjust_quantity(
        &self,
        variant_id: &str,
        delta: i64,
        location_id: &str,
    ) -> SyncResult<()> {
        let request = AdjustInventoryRequest {
            quantity: delta,
            location: location_id,
        };
        let response = self
            .client
            .post(self.url(&format!("/product_variants/{}/adjust_inventory", variant_id)))
            .bearer_auth(self.token.expose())
            .json(&request)
            .send()
            .await?;
        check_status(SERVICE, variant_id, response).await?;
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
struct VariantListResponse {
    #[serde(default)]
    data: Vec<VariantResource>,
    #[serde(default)]
    meta: Option<ListMeta>,
}

impl VariantListResponse {
    fn into_page(self) -> NumberedPage<MarianaTekVariant> {
        NumberedPage {
            page_count: self.meta.and_then(|m| m.pagination).and_then(|p| p.pages),
            items: self.data.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListMeta {
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    #[serde(default)]
    pages: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct VariantResponse {
    data: VariantResource,
}

#[derive(Debug, Deserialize)]
struct VariantResource {
    id: String,
    #[serde(default)]
    attributes: VariantInventory,
}

impl From<VariantResource> for MarianaTekVariant {
    fn from(resource: VariantResource) -> Self {
        MarianaTekVariant {
            id: resource.id,
            inventory: resource.attributes,
        }
    }
}

#[derive(Debug, Serialize)]
struct AdjustInventoryRequest<'a> {
    quantity: i64,
    location: &'a str,
}
