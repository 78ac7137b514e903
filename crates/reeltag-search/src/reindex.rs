//! Full reindex: walk every live segment and push it to the index.
//!
//! Run after index loss or mapping changes, and as the repair path for
//! batches the detached synchronizer dropped.

use std::future::Future;

use tracing::{info, instrument};

use reeltag_core::{defaults::REINDEX_PAGE_SIZE, Result, SearchIndex, SegmentDocument};

/// Page through all live segment documents and bulk-upsert each page.
///
/// `fetch_page(limit, offset)` supplies one page (see
/// `PgSegmentStore::index_documents_page` in `reeltag-db`). Stops on the
/// first short page. Returns the number of documents pushed.
#[instrument(skip_all, fields(subsystem = "search", operation = "reindex"))]
pub async fn reindex_all<F, Fut>(index: &dyn SearchIndex, mut fetch_page: F) -> Result<u64>
where
    F: FnMut(i64, i64) -> Fut,
    Fut: Future<Output = Result<Vec<SegmentDocument>>>,
{
    let page_size = REINDEX_PAGE_SIZE;
    let mut offset = 0i64;
    let mut total = 0u64;

    loop {
        let page = fetch_page(page_size, offset).await?;
        if page.is_empty() {
            break;
        }
        let fetched = page.len();
        index.bulk_upsert(&page).await?;
        total += fetched as u64;
        if (fetched as i64) < page_size {
            break;
        }
        offset += page_size;
    }

    info!(indexed = total, "full reindex finished");
    Ok(total)
}
