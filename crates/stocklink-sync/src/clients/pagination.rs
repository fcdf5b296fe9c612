//! Page accumulation for the two pagination styles.
//!
//! Both collectors pause for `page_delay` between pages (not after the last
//! one) and abort with `MalformedResponse` when a page lacks the metadata
//! needed to know whether more pages follow.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::{SyncError, SyncResult};

/// One page of a page-number paginated listing.
#[derive(Debug, Clone)]
pub struct NumberedPage<T> {
    pub items: Vec<T>,
    /// Total number of pages reported by the server.
    pub page_count: Option<u32>,
}

/// One page of an offset/limit paginated listing.
#[derive(Debug, Clone)]
pub struct OffsetPage<T> {
    pub items: Vec<T>,
    /// Total number of items reported by the server.
    pub total: Option<u64>,
}

/// Fetches pages 1..=page_count, where page_count comes from each response.
pub async fn collect_numbered<T, F, Fut>(
    service: &'static str,
    page_delay: Duration,
    mut fetch_page: F,
) -> SyncResult<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = SyncResult<NumberedPage<T>>>,
{
    let mut items = Vec::new();
    let mut page = 1u32;

    loop {
        let response = fetch_page(page).await?;
        let page_count = response
            .page_count
            .ok_or_else(|| SyncError::malformed(service, format!("page {} has no page count", page)))?;

        debug!(service, page, page_count, received = response.items.len(), "Fetched page");
        items.extend(response.items);

        if page >= page_count {
            return Ok(items);
        }
        tokio::time::sleep(page_delay).await;
        page += 1;
    }
}

/// Fetches `limit`-sized pages until the offset reaches the reported total.
pub async fn collect_offset<T, F, Fut>(
    service: &'static str,
    limit: u32,
    page_delay: Duration,
    mut fetch_page: F,
) -> SyncResult<Vec<T>>
where
    F: FnMut(u64, u32) -> Fut,
    Fut: Future<Output = SyncResult<OffsetPage<T>>>,
{
    if limit == 0 {
        return Err(SyncError::InvalidConfig("page limit must be greater than 0".into()));
    }

    let mut items = Vec::new();
    let mut offset = 0u64;

    loop {
        let response = fetch_page(offset, limit).await?;
        let total = response.total.ok_or_else(|| {
            SyncError::malformed(service, format!("page at offset {} has no total", offset))
        })?;

        let received = response.items.len();
        debug!(service, offset, total, received, "Fetched page");
        items.extend(response.items);

        offset += u64::from(limit);
        // An empty page means the server stopped short of its own total.
        if offset >= total || received == 0 {
            return Ok(items);
        }
        tokio::time::sleep(page_delay).await;
    }
}
