//! In-memory record store.
//!
//! Used by tests and demos in place of the RocksDB store. Besides the
//! [`RecordStore`] contract it records every page query it serves and can
//! be told to fail count/page queries for a type.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, RwLock};

use serde_json::Value;
use sync_types::{MetadataValues, RawRecord, RecordId};

use crate::error::StorageError;
use crate::store::{RecordStore, RecordWriter};

struct MetaRow {
    owner: RecordId,
    key: String,
    value: Value,
}

#[derive(Default)]
struct Table {
    records: BTreeMap<RecordId, RawRecord>,
    metadata: BTreeMap<RecordId, MetaRow>,
}

/// A page query served by [`InMemoryRecordStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub doc_type: String,
    pub offset: u64,
    pub limit: u64,
    /// Rows or ids actually returned
    pub returned: usize,
    /// Whether this was an id-only page
    pub ids_only: bool,
}

/// Record store held entirely in memory.
#[derive(Default)]
pub struct InMemoryRecordStore {
    tables: RwLock<HashMap<String, Table>>,
    failing: RwLock<HashSet<String>>,
    requests: Mutex<Vec<PageRequest>>,
}

fn poisoned<T>(_: T) -> StorageError {
    StorageError::Unavailable("lock poisoned".to_string())
}

fn to_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make count and page queries for `doc_type` fail until cleared.
    pub fn fail_queries(&self, doc_type: &str) {
        if let Ok(mut failing) = self.failing.write() {
            failing.insert(doc_type.to_string());
        }
    }

    /// Stop failing queries for `doc_type`.
    pub fn clear_failures(&self, doc_type: &str) {
        if let Ok(mut failing) = self.failing.write() {
            failing.remove(doc_type);
        }
    }

    /// Page queries served so far, in call order.
    pub fn page_requests(&self) -> Vec<PageRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn check_failing(&self, doc_type: &str) -> Result<(), StorageError> {
        let failing = self.failing.read().map_err(poisoned)?;
        if failing.contains(doc_type) {
            return Err(StorageError::Unavailable(format!(
                "queries for {} are failing",
                doc_type
            )));
        }
        Ok(())
    }

    fn log_request(
        &self,
        doc_type: &str,
        offset: u64,
        limit: u64,
        returned: usize,
        ids_only: bool,
    ) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(PageRequest {
                doc_type: doc_type.to_string(),
                offset,
                limit,
                returned,
                ids_only,
            });
        }
    }

    fn descending_ids(
        &self,
        doc_type: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<RecordId>, StorageError> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables
            .get(doc_type)
            .map(|t| {
                t.records
                    .keys()
                    .rev()
                    .skip(to_usize(offset))
                    .take(to_usize(limit))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl RecordStore for InMemoryRecordStore {
    fn fetch_record(
        &self,
        doc_type: &str,
        id: &RecordId,
    ) -> Result<Option<RawRecord>, StorageError> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables.get(doc_type).and_then(|t| t.records.get(id).cloned()))
    }

    fn fetch_metadata(
        &self,
        doc_type: &str,
        id: &RecordId,
    ) -> Result<MetadataValues, StorageError> {
        let tables = self.tables.read().map_err(poisoned)?;
        let mut meta = MetadataValues::new();
        if let Some(table) = tables.get(doc_type) {
            for row in table.metadata.values().filter(|row| &row.owner == id) {
                meta.entry(row.key.clone())
                    .or_default()
                    .push(row.value.clone());
            }
        }
        Ok(meta)
    }

    fn count(&self, doc_type: &str) -> Result<u64, StorageError> {
        self.check_failing(doc_type)?;
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables
            .get(doc_type)
            .map(|t| t.records.len() as u64)
            .unwrap_or(0))
    }

    fn page(
        &self,
        doc_type: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<RawRecord>, StorageError> {
        self.check_failing(doc_type)?;
        let ids = self.descending_ids(doc_type, offset, limit)?;
        let tables = self.tables.read().map_err(poisoned)?;
        let rows: Vec<RawRecord> = ids
            .iter()
            .filter_map(|id| tables.get(doc_type).and_then(|t| t.records.get(id).cloned()))
            .collect();
        drop(tables);
        self.log_request(doc_type, offset, limit, rows.len(), false);
        Ok(rows)
    }

    fn page_ids(
        &self,
        doc_type: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<RecordId>, StorageError> {
        self.check_failing(doc_type)?;
        let ids = self.descending_ids(doc_type, offset, limit)?;
        self.log_request(doc_type, offset, limit, ids.len(), true);
        Ok(ids)
    }

    fn metadata_owner(
        &self,
        doc_type: &str,
        meta_id: &RecordId,
    ) -> Result<Option<RecordId>, StorageError> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables
            .get(doc_type)
            .and_then(|t| t.metadata.get(meta_id))
            .map(|row| row.owner.clone()))
    }
}

impl RecordWriter for InMemoryRecordStore {
    fn put_record(
        &self,
        doc_type: &str,
        id: &RecordId,
        row: &RawRecord,
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        tables
            .entry(doc_type.to_string())
            .or_default()
            .records
            .insert(id.clone(), row.clone());
        Ok(())
    }

    fn delete_record(&self, doc_type: &str, id: &RecordId) -> Result<bool, StorageError> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        let Some(table) = tables.get_mut(doc_type) else {
            return Ok(false);
        };
        let existed = table.records.remove(id).is_some();
        table.metadata.retain(|_, row| &row.owner != id);
        Ok(existed)
    }

    fn put_metadata(
        &self,
        doc_type: &str,
        owner: &RecordId,
        meta_id: &RecordId,
        key: &str,
        value: Value,
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        tables.entry(doc_type.to_string()).or_default().metadata.insert(
            meta_id.clone(),
            MetaRow {
                owner: owner.clone(),
                key: key.to_string(),
                value,
            },
        );
        Ok(())
    }

    fn delete_metadata(
        &self,
        doc_type: &str,
        meta_id: &RecordId,
    ) -> Result<Option<RecordId>, StorageError> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        Ok(tables
            .get_mut(doc_type)
            .and_then(|t| t.metadata.remove(meta_id))
            .map(|row| row.owner))
    }
}
