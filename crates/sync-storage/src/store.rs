//! The record store contract consumed by the indexing core.

use sync_types::{MetadataValues, RawRecord, RecordId};

use crate::error::StorageError;

/// Read access to the backing record store.
///
/// Rows are returned with store-native field names; the indexing core is
/// responsible for canonicalizing them. Paging is always in descending
/// primary-key order and `count` must agree with what paging yields.
pub trait RecordStore: Send + Sync {
    /// Fetch one row, `None` if it does not exist.
    fn fetch_record(
        &self,
        doc_type: &str,
        id: &RecordId,
    ) -> Result<Option<RawRecord>, StorageError>;

    /// Fetch all metadata of one record, values per key in store order.
    fn fetch_metadata(&self, doc_type: &str, id: &RecordId) -> Result<MetadataValues, StorageError>;

    /// Number of rows of a type.
    fn count(&self, doc_type: &str) -> Result<u64, StorageError>;

    /// Rows ordered by descending primary key, `offset`/`limit` applied.
    fn page(&self, doc_type: &str, offset: u64, limit: u64) -> Result<Vec<RawRecord>, StorageError>;

    /// Ids ordered by descending primary key, `offset`/`limit` applied.
    fn page_ids(
        &self,
        doc_type: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<RecordId>, StorageError>;

    /// Owning record of a metadata row.
    fn metadata_owner(
        &self,
        doc_type: &str,
        meta_id: &RecordId,
    ) -> Result<Option<RecordId>, StorageError>;
}

/// Write access used by loaders and tests.
pub trait RecordWriter: Send + Sync {
    /// Insert or replace a row.
    fn put_record(
        &self,
        doc_type: &str,
        id: &RecordId,
        row: &RawRecord,
    ) -> Result<(), StorageError>;

    /// Remove a row and all of its metadata. Returns whether it existed.
    fn delete_record(&self, doc_type: &str, id: &RecordId) -> Result<bool, StorageError>;

    /// Insert or replace one metadata row.
    fn put_metadata(
        &self,
        doc_type: &str,
        owner: &RecordId,
        meta_id: &RecordId,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), StorageError>;

    /// Remove one metadata row. Returns the owner if it existed.
    fn delete_metadata(
        &self,
        doc_type: &str,
        meta_id: &RecordId,
    ) -> Result<Option<RecordId>, StorageError>;
}
