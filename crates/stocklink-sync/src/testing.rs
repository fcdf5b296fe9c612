//! In-memory remote systems for engine and scheduler tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use stocklink_core::{extract_quantity, LocationOverride, Quantity, RegionOverride, VariantInventory};

use crate::clients::{
    ItemInventory, MarianaTekVariant, NumberedPage, OffsetPage, SideAClient, SideBClient, WebflowItem,
};
use crate::error::{SyncError, SyncResult};

/// Builds an inventory whose first location override carries `quantity`.
pub fn override_inventory(quantity: Quantity) -> VariantInventory {
    VariantInventory {
        regions: Some(vec![RegionOverride {
            id: Some("r1".into()),
            locations: Some(vec![LocationOverride {
                id: Some("48".into()),
                present_quantity: Some(json!(quantity)),
            }]),
        }]),
        present_quantity: None,
    }
}

/// Builds an inventory that only has the flat fallback field.
pub fn flat_inventory(quantity: Quantity) -> VariantInventory {
    VariantInventory {
        regions: None,
        present_quantity: Some(json!(quantity)),
    }
}

// =============================================================================
// Fake Mariana Tek
// =============================================================================

/// Page size the fake uses unless told otherwise.
const FAKE_PAGE_SIZE: usize = 100;

#[derive(Default)]
pub struct FakeMarianaTek {
    variants: Mutex<BTreeMap<String, VariantInventory>>,
    adjustments: Mutex<Vec<(String, i64, String)>>,
    page_size: Mutex<Option<usize>>,
    page_requests: Mutex<Vec<u32>>,
    page_errors: Mutex<Vec<(u32, SyncError)>>,
    fetch_errors: Mutex<VecDeque<SyncError>>,
}

impl FakeMarianaTek {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a variant's inventory to a single location override.
    pub fn set(&self, id: &str, quantity: Quantity) {
        self.set_inventory(id, override_inventory(quantity));
    }

    pub fn set_inventory(&self, id: &str, inventory: VariantInventory) {
        self.variants.lock().unwrap().insert(id.to_string(), inventory);
    }

    pub fn set_page_size(&self, size: usize) {
        *self.page_size.lock().unwrap() = Some(size);
    }

    /// Queues an error for the next request of the first listing page.
    pub fn fail_list(&self, err: SyncError) {
        self.fail_page(1, err);
    }

    /// Queues an error for the next request of `page`.
    pub fn fail_page(&self, page: u32, err: SyncError) {
        self.page_errors.lock().unwrap().push((page, err));
    }

    /// Every listing page requested so far, in order.
    pub fn page_requests(&self) -> Vec<u32> {
        self.page_requests.lock().unwrap().clone()
    }

    /// Queues an error for the next `fetch_variant` call.
    pub fn fail_fetch(&self, err: SyncError) {
        self.fetch_errors.lock().unwrap().push_back(err);
    }

    pub fn adjustments(&self) -> Vec<(String, i64, String)> {
        self.adjustments.lock().unwrap().clone()
    }
}

#[async_trait]
impl SideAClient for FakeMarianaTek {
    async fn fetch_variant_page(&self, page: u32) -> SyncResult<NumberedPage<MarianaTekVariant>> {
        self.page_requests.lock().unwrap().push(page);
        {
            let mut errors = self.page_errors.lock().unwrap();
            if let Some(pos) = errors.iter().position(|(p, _)| *p == page) {
                return Err(errors.remove(pos).1);
            }
        }

        let size = self.page_size.lock().unwrap().unwrap_or(FAKE_PAGE_SIZE);
        let variants = self.variants.lock().unwrap();
        let page_count = variants.len().div_ceil(size).max(1) as u32;
        let items = variants
            .iter()
            .skip((page as usize - 1) * size)
            .take(size)
            .map(|(id, inventory)| MarianaTekVariant {
                id: id.clone(),
                inventory: inventory.clone(),
            })
            .collect();

        Ok(NumberedPage {
            items,
            page_count: Some(page_count),
        })
    }

    async fn fetch_variant(&self, variant_id: &str) -> SyncResult<MarianaTekVariant> {
        if let Some(err) = self.fetch_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.variants
            .lock()
            .unwrap()
            .get(variant_id)
            .map(|inventory| MarianaTekVariant {
                id: variant_id.to_string(),
                inventory: inventory.clone(),
            })
            .ok_or_else(|| SyncError::NotFound {
                service: "marianatek",
                resource: variant_id.to_string(),
            })
    }

    async fn adjust_quantity(
        &self,
        variant_id: &str,
        delta: i64,
        location_id: &str,
    ) -> SyncResult<()> {
        self.adjustments
            .lock()
            .unwrap()
            .push((variant_id.to_string(), delta, location_id.to_string()));

        if let Some(inventory) = self.variants.lock().unwrap().get_mut(variant_id) {
            let current = extract_quantity(inventory).quantity() as i64;
            *inventory = override_inventory((current + delta).max(0) as Quantity);
        }
        Ok(())
    }
}

// =============================================================================
// Fake Webflow
// =============================================================================

#[derive(Default)]
pub struct FakeWebflow {
    items: Mutex<BTreeMap<String, Quantity>>,
    sets: Mutex<Vec<(String, Quantity)>>,
    list_errors: Mutex<VecDeque<SyncError>>,
    quantity_errors: Mutex<VecDeque<SyncError>>,
}

impl FakeWebflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, id: &str, quantity: Quantity) {
        self.items.lock().unwrap().insert(id.to_string(), quantity);
    }

    pub fn quantity(&self, id: &str) -> Option<Quantity> {
        self.items.lock().unwrap().get(id).copied()
    }

    /// Queues an error for the next listing page request.
    pub fn fail_list(&self, err: SyncError) {
        self.list_errors.lock().unwrap().push_back(err);
    }

    /// Queues an error for the next `fetch_quantity` call.
    pub fn fail_quantity(&self, err: SyncError) {
        self.quantity_errors.lock().unwrap().push_back(err);
    }

    pub fn sets(&self) -> Vec<(String, Quantity)> {
        self.sets.lock().unwrap().clone()
    }
}

#[async_trait]
impl SideBClient for FakeWebflow {
    fn page_limit(&self) -> u32 {
        FAKE_PAGE_SIZE as u32
    }

    async fn fetch_item_page(&self, offset: u64, limit: u32) -> SyncResult<OffsetPage<WebflowItem>> {
        if let Some(err) = self.list_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        let items = self.items.lock().unwrap();
        Ok(OffsetPage {
            total: Some(items.len() as u64),
            items: items
                .keys()
                .skip(offset as usize)
                .take(limit as usize)
                .map(|id| WebflowItem { id: id.clone() })
                .collect(),
        })
    }

    async fn fetch_quantity(&self, item_id: &str) -> SyncResult<ItemInventory> {
        if let Some(err) = self.quantity_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.quantity(item_id)
            .map(ItemInventory::finite)
            .ok_or_else(|| SyncError::NotFound {
                service: "webflow",
                resource: item_id.to_string(),
            })
    }

    async fn set_quantity(&self, item_id: &str, quantity: Quantity) -> SyncResult<()> {
        self.sets.lock().unwrap().push((item_id.to_string(), quantity));
        self.items.lock().unwrap().insert(item_id.to_string(), quantity);
        Ok(())
    }
}
