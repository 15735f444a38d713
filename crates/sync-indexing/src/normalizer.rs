//! Document normalization.
//!
//! Turns a record, given by id or by value, into a flat [`Document`]:
//! the primary key is canonicalized into `ID`, metadata is flattened to
//! the first stored value per key, and a type-specific filter runs last.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use sync_storage::RecordStore;
use sync_types::{Document, MetadataValues, RawRecord, Record, RecordId};

use crate::error::NormalizationError;

/// Input to normalization.
#[derive(Debug, Clone)]
pub enum ItemRef {
    /// Resolve the record through the store
    Id(RecordId),
    /// Pre-fetched store row
    Record(RawRecord),
}

impl From<RecordId> for ItemRef {
    fn from(id: RecordId) -> Self {
        ItemRef::Id(id)
    }
}

impl From<RawRecord> for ItemRef {
    fn from(raw: RawRecord) -> Self {
        ItemRef::Record(raw)
    }
}

/// Final, type-specific pass over a normalized document.
pub trait DocumentFilter: Send + Sync {
    fn filter(&self, document: Document) -> Document;
}

/// Filter that keeps every field.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeepAllFields;

impl DocumentFilter for KeepAllFields {
    fn filter(&self, document: Document) -> Document {
        document
    }
}

/// Filter that drops the named attributes.
#[derive(Debug, Default, Clone)]
pub struct ExcludeFields {
    fields: Vec<String>,
}

impl ExcludeFields {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl DocumentFilter for ExcludeFields {
    fn filter(&self, mut document: Document) -> Document {
        for field in &self.fields {
            document.fields.remove(field);
        }
        document
    }
}

/// Keep the first stored value of each metadata key.
///
/// Keys without any value are left out. An empty key cannot be addressed
/// in the index and fails the whole document.
pub fn flatten_metadata(
    doc_type: &str,
    id: &RecordId,
    metadata: MetadataValues,
) -> Result<BTreeMap<String, Value>, NormalizationError> {
    let mut flat = BTreeMap::new();
    for (key, values) in metadata {
        if key.trim().is_empty() {
            return Err(NormalizationError::MalformedMetadata {
                doc_type: doc_type.to_string(),
                id: id.clone(),
                reason: "empty metadata key".to_string(),
            });
        }
        if let Some(first) = values.into_iter().next() {
            flat.insert(key, first);
        }
    }
    Ok(flat)
}

/// Store-backed normalizer shared by type bindings.
pub struct Normalizer<'a> {
    store: &'a dyn RecordStore,
    doc_type: &'a str,
    primary_key: &'a str,
}

impl<'a> Normalizer<'a> {
    pub fn new(store: &'a dyn RecordStore, doc_type: &'a str, primary_key: &'a str) -> Self {
        Self {
            store,
            doc_type,
            primary_key,
        }
    }

    /// Resolve a raw row for the item.
    fn resolve(&self, item: ItemRef) -> Result<RawRecord, NormalizationError> {
        match item {
            ItemRef::Record(raw) => Ok(raw),
            ItemRef::Id(id) => {
                if id.is_empty() {
                    return Err(NormalizationError::MissingId {
                        doc_type: self.doc_type.to_string(),
                    });
                }
                self.store
                    .fetch_record(self.doc_type, &id)?
                    .ok_or_else(|| NormalizationError::NotFound {
                        doc_type: self.doc_type.to_string(),
                        id,
                    })
            }
        }
    }

    /// Normalize an item.
    ///
    /// `derive` adds computed fields before `filter` runs.
    pub fn normalize<F>(
        &self,
        item: ItemRef,
        derive: F,
        filter: &dyn DocumentFilter,
    ) -> Result<Document, NormalizationError>
    where
        F: FnOnce(&mut Document),
    {
        let raw = self.resolve(item)?;
        let record = Record::from_raw(raw, self.primary_key).ok_or_else(|| {
            NormalizationError::MissingId {
                doc_type: self.doc_type.to_string(),
            }
        })?;

        let metadata = self.store.fetch_metadata(self.doc_type, &record.id)?;
        let meta = flatten_metadata(self.doc_type, &record.id, metadata)?;

        let mut document = Document::new(self.doc_type, record, meta);
        derive(&mut document);

        debug!(key = %document.key(), "Normalized record");
        Ok(filter.filter(document))
    }
}
