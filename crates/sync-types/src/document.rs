//! Indexable document produced by normalization.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::record::{Record, RecordId, RESERVED_FIELDS};

/// A flat, index-ready view of one record.
///
/// Serializes as a single JSON object: the record attributes, `ID`,
/// `meta` and `doc_type` side by side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Name of the content type this document belongs to
    pub doc_type: String,

    /// Canonical primary key
    #[serde(rename = "ID")]
    pub id: RecordId,

    /// Flattened metadata, one scalar per key. Always present.
    #[serde(default)]
    pub meta: BTreeMap<String, Value>,

    /// Record attributes plus derived fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    /// Build a document from a canonical record and its flattened metadata.
    pub fn new(doc_type: impl Into<String>, record: Record, meta: BTreeMap<String, Value>) -> Self {
        Self {
            doc_type: doc_type.into(),
            id: record.id,
            meta,
            fields: record.fields,
        }
    }

    /// Set a derived field, replacing any existing value.
    ///
    /// `ID`, `meta` and `doc_type` are reserved and silently ignored.
    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if RESERVED_FIELDS.contains(&name.as_str()) {
            return;
        }
        self.fields.insert(name, value);
    }

    /// Get an attribute by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Stable key used by backends to address this document.
    pub fn key(&self) -> String {
        document_key(&self.doc_type, &self.id)
    }

    /// Serialize to a JSON value.
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Serialize to JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Backend address of a document: `{doc_type}:{id}`.
pub fn document_key(doc_type: &str, id: &RecordId) -> String {
    format!("{}:{}", doc_type, id)
}
