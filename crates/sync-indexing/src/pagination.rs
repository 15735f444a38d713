//! Page arithmetic shared by type bindings and the bulk driver.
//!
//! Pages are 1-based. Page `0` and negative pages read from the start,
//! and a zero page size yields an empty page.

use sync_storage::{RecordStore, StorageError};
use sync_types::{RawRecord, RecordId};

/// Row offset of a page.
pub fn page_offset(page: i64, per_page: u64) -> u64 {
    if page > 0 {
        (page as u64 - 1).saturating_mul(per_page)
    } else {
        0
    }
}

/// Number of pages needed to cover `total` rows.
pub fn page_count(total: u64, per_page: u64) -> u64 {
    if per_page == 0 {
        0
    } else {
        total.div_ceil(per_page)
    }
}

/// Fetch a page of rows in descending primary-key order.
pub fn fetch_page(
    store: &dyn RecordStore,
    doc_type: &str,
    page: i64,
    per_page: u64,
) -> Result<Vec<RawRecord>, StorageError> {
    if per_page == 0 {
        return Ok(Vec::new());
    }
    store.page(doc_type, page_offset(page, per_page), per_page)
}

/// Fetch a page of ids in descending primary-key order.
pub fn fetch_page_ids(
    store: &dyn RecordStore,
    doc_type: &str,
    page: i64,
    per_page: u64,
) -> Result<Vec<RecordId>, StorageError> {
    if per_page == 0 {
        return Ok(Vec::new());
    }
    store.page_ids(doc_type, page_offset(page, per_page), per_page)
}
