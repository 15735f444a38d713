//! RocksDB-backed record store.
//!
//! Provides:
//! - Database open with column family setup
//! - Descending-id paging via reverse iteration over a type prefix
//! - Atomic record + metadata writes via WriteBatch

use rocksdb::{ColumnFamily, Direction, IteratorMode, Options, WriteBatch, DB};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

use sync_types::{MetadataValues, RawRecord, RecordId};

use crate::column_families::{
    build_cf_descriptors, ALL_CF_NAMES, CF_METADATA, CF_META_OWNERS, CF_RECORDS,
};
use crate::error::StorageError;
use crate::keys::{MetaOwnerKey, MetadataKey, RecordKey};
use crate::store::{RecordStore, RecordWriter};

/// Stored form of one metadata row.
#[derive(Debug, Serialize, Deserialize)]
struct MetaEntry {
    key: String,
    value: Value,
}

/// RocksDB record store
pub struct Storage {
    db: DB,
}

impl Storage {
    /// Open storage at the given path, creating if necessary
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        info!("Opening storage at {:?}", path);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_background_jobs(4);

        let db = DB::open_cf_descriptors(&db_opts, path, build_cf_descriptors())?;
        Ok(Self { db })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily, StorageError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(name.to_string()))
    }

    /// Walk record keys of a type from the highest id down.
    ///
    /// `visit` returns false to stop early.
    fn scan_descending<F>(&self, doc_type: &str, mut visit: F) -> Result<(), StorageError>
    where
        F: FnMut(&[u8], &[u8]) -> Result<bool, StorageError>,
    {
        let cf = self.cf(CF_RECORDS)?;
        let prefix = RecordKey::prefix(doc_type);
        let upper = RecordKey::upper_bound(doc_type);

        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&upper, Direction::Reverse));
        for item in iter {
            let (key, value) = item?;
            if key.as_ref() >= upper.as_slice() {
                continue;
            }
            if !key.starts_with(&prefix) {
                break;
            }
            if !visit(&key[..], &value[..])? {
                break;
            }
        }
        Ok(())
    }

    fn descending_page<T, F>(
        &self,
        doc_type: &str,
        offset: u64,
        limit: u64,
        mut decode: F,
    ) -> Result<Vec<T>, StorageError>
    where
        F: FnMut(&[u8], &[u8]) -> Result<T, StorageError>,
    {
        let mut results = Vec::new();
        if limit == 0 {
            return Ok(results);
        }
        let mut skipped = 0u64;
        self.scan_descending(doc_type, |key, value| {
            if skipped < offset {
                skipped += 1;
                return Ok(true);
            }
            results.push(decode(key, value)?);
            Ok((results.len() as u64) < limit)
        })?;
        Ok(results)
    }

    /// Flush all column families to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        for cf_name in ALL_CF_NAMES {
            if let Some(cf) = self.db.cf_handle(cf_name) {
                self.db.flush_cf(cf)?;
            }
        }
        Ok(())
    }
}

impl RecordStore for Storage {
    fn fetch_record(
        &self,
        doc_type: &str,
        id: &RecordId,
    ) -> Result<Option<RawRecord>, StorageError> {
        let cf = self.cf(CF_RECORDS)?;
        let key = RecordKey::new(doc_type, id.clone());
        match self.db.get_cf(cf, key.to_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn fetch_metadata(
        &self,
        doc_type: &str,
        id: &RecordId,
    ) -> Result<MetadataValues, StorageError> {
        let cf = self.cf(CF_METADATA)?;
        let prefix = MetadataKey::owner_prefix(doc_type, id);
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward));

        let mut meta = MetadataValues::new();
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            let entry: MetaEntry = serde_json::from_slice(&value)?;
            meta.entry(entry.key).or_default().push(entry.value);
        }
        Ok(meta)
    }

    fn count(&self, doc_type: &str) -> Result<u64, StorageError> {
        let mut count = 0u64;
        self.scan_descending(doc_type, |_, _| {
            count += 1;
            Ok(true)
        })?;
        Ok(count)
    }

    fn page(
        &self,
        doc_type: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<RawRecord>, StorageError> {
        let rows = self.descending_page(doc_type, offset, limit, |_, value| {
            serde_json::from_slice::<RawRecord>(value).map_err(StorageError::from)
        })?;
        debug!(doc_type, offset, limit, returned = rows.len(), "Served record page");
        Ok(rows)
    }

    fn page_ids(
        &self,
        doc_type: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<RecordId>, StorageError> {
        let ids = self.descending_page(doc_type, offset, limit, |key, _| {
            RecordKey::from_bytes(key).map(|k| k.id)
        })?;
        debug!(doc_type, offset, limit, returned = ids.len(), "Served id page");
        Ok(ids)
    }

    fn metadata_owner(
        &self,
        doc_type: &str,
        meta_id: &RecordId,
    ) -> Result<Option<RecordId>, StorageError> {
        let cf = self.cf(CF_META_OWNERS)?;
        let key = MetaOwnerKey::new(doc_type, meta_id.clone());
        match self.db.get_cf(cf, key.to_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

impl RecordWriter for Storage {
    fn put_record(
        &self,
        doc_type: &str,
        id: &RecordId,
        row: &RawRecord,
    ) -> Result<(), StorageError> {
        let cf = self.cf(CF_RECORDS)?;
        let key = RecordKey::new(doc_type, id.clone());
        self.db.put_cf(cf, key.to_bytes(), serde_json::to_vec(row)?)?;
        debug!(doc_type, id = %id, "Stored record");
        Ok(())
    }

    fn delete_record(&self, doc_type: &str, id: &RecordId) -> Result<bool, StorageError> {
        let records_cf = self.cf(CF_RECORDS)?;
        let meta_cf = self.cf(CF_METADATA)?;
        let owners_cf = self.cf(CF_META_OWNERS)?;

        let key = RecordKey::new(doc_type, id.clone()).to_bytes();
        let existed = self.db.get_cf(records_cf, &key)?.is_some();

        let mut batch = WriteBatch::default();
        batch.delete_cf(records_cf, &key);

        // Drop the record's metadata along with it
        let prefix = MetadataKey::owner_prefix(doc_type, id);
        let iter = self
            .db
            .iterator_cf(meta_cf, IteratorMode::From(&prefix, Direction::Forward));
        for item in iter {
            let (meta_key, _) = item?;
            if !meta_key.starts_with(&prefix) {
                break;
            }
            let meta_id = crate::keys::decode_id(&meta_key[prefix.len()..])?;
            batch.delete_cf(meta_cf, &meta_key);
            batch.delete_cf(owners_cf, MetaOwnerKey::new(doc_type, meta_id).to_bytes());
        }

        self.db.write(batch)?;
        debug!(doc_type, id = %id, existed, "Deleted record");
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
        let meta_cf = self.cf(CF_METADATA)?;
        let owners_cf = self.cf(CF_META_OWNERS)?;

        let mut batch = WriteBatch::default();
        // A metadata row may move between owners; drop the old placement
        if let Some(previous) = self.metadata_owner(doc_type, meta_id)? {
            batch.delete_cf(
                meta_cf,
                MetadataKey::new(doc_type, previous, meta_id.clone()).to_bytes(),
            );
        }

        let entry = MetaEntry {
            key: key.to_string(),
            value,
        };
        batch.put_cf(
            meta_cf,
            MetadataKey::new(doc_type, owner.clone(), meta_id.clone()).to_bytes(),
            serde_json::to_vec(&entry)?,
        );
        batch.put_cf(
            owners_cf,
            MetaOwnerKey::new(doc_type, meta_id.clone()).to_bytes(),
            serde_json::to_vec(owner)?,
        );
        self.db.write(batch)?;
        Ok(())
    }

    fn delete_metadata(
        &self,
        doc_type: &str,
        meta_id: &RecordId,
    ) -> Result<Option<RecordId>, StorageError> {
        let Some(owner) = self.metadata_owner(doc_type, meta_id)? else {
            return Ok(None);
        };
        let meta_cf = self.cf(CF_METADATA)?;
        let owners_cf = self.cf(CF_META_OWNERS)?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(
            meta_cf,
            MetadataKey::new(doc_type, owner.clone(), meta_id.clone()).to_bytes(),
        );
        batch.delete_cf(owners_cf, MetaOwnerKey::new(doc_type, meta_id.clone()).to_bytes());
        self.db.write(batch)?;
        Ok(Some(owner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::open(temp_dir.path()).unwrap();
        (storage, temp_dir)
    }

    fn row(id: i64) -> RawRecord {
        json!({"comment_ID": id.to_string(), "comment_content": format!("comment {}", id)})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_open_creates_column_families() {
        let (storage, _temp) = create_test_storage();
        for cf_name in ALL_CF_NAMES {
            assert!(
                storage.db.cf_handle(cf_name).is_some(),
                "CF {} should exist",
                cf_name
            );
        }
    }

    #[test]
    fn test_put_and_fetch_record() {
        let (storage, _temp) = create_test_storage();
        storage.put_record("comment", &RecordId::Int(3), &row(3)).unwrap();

        let fetched = storage.fetch_record("comment", &RecordId::Int(3)).unwrap();
        assert_eq!(fetched, Some(row(3)));
        assert!(storage.fetch_record("comment", &RecordId::Int(4)).unwrap().is_none());
        assert!(storage.fetch_record("post", &RecordId::Int(3)).unwrap().is_none());
    }

    #[test]
    fn test_paging_descends_and_isolates_types() {
        let (storage, _temp) = create_test_storage();
        for id in 1..=12 {
            storage.put_record("comment", &RecordId::Int(id), &row(id)).unwrap();
        }
        storage.put_record("post", &RecordId::Int(100), &row(100)).unwrap();
        storage.put_record("commentx", &RecordId::Int(50), &row(50)).unwrap();

        assert_eq!(storage.count("comment").unwrap(), 12);

        let first = storage.page_ids("comment", 0, 5).unwrap();
        assert_eq!(
            first,
            (8..=12).rev().map(RecordId::Int).collect::<Vec<_>>()
        );
        let last = storage.page_ids("comment", 10, 5).unwrap();
        assert_eq!(last, vec![RecordId::Int(2), RecordId::Int(1)]);

        let rows = storage.page("comment", 5, 2).unwrap();
        assert_eq!(rows, vec![row(7), row(6)]);

        assert!(storage.page("comment", 0, 0).unwrap().is_empty());
    }

    #[test]
    fn test_metadata_roundtrip() {
        let (storage, _temp) = create_test_storage();
        let owner = RecordId::Int(7);
        storage.put_record("comment", &owner, &row(7)).unwrap();
        storage.put_metadata("comment", &owner, &RecordId::Int(98), "rating", json!("4")).unwrap();
        storage.put_metadata("comment", &owner, &RecordId::Int(99), "rating", json!("2")).unwrap();

        let meta = storage.fetch_metadata("comment", &owner).unwrap();
        assert_eq!(meta["rating"], vec![json!("4"), json!("2")]);
        assert_eq!(
            storage.metadata_owner("comment", &RecordId::Int(99)).unwrap(),
            Some(owner.clone())
        );

        assert_eq!(
            storage.delete_metadata("comment", &RecordId::Int(98)).unwrap(),
            Some(owner.clone())
        );
        let meta = storage.fetch_metadata("comment", &owner).unwrap();
        assert_eq!(meta["rating"], vec![json!("2")]);
    }

    #[test]
    fn test_delete_record_removes_metadata() {
        let (storage, _temp) = create_test_storage();
        let owner = RecordId::Int(7);
        storage.put_record("comment", &owner, &row(7)).unwrap();
        storage.put_metadata("comment", &owner, &RecordId::Int(1), "k", json!("v")).unwrap();

        assert!(storage.delete_record("comment", &owner).unwrap());
        assert!(storage.fetch_metadata("comment", &owner).unwrap().is_empty());
        assert!(storage.metadata_owner("comment", &RecordId::Int(1)).unwrap().is_none());
        assert_eq!(storage.count("comment").unwrap(), 0);
    }
}
