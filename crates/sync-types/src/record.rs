//! Record identifiers and store rows.
//!
//! Rows arrive from the record store with store-native field names
//! (e.g. `comment_ID`). [`Record::from_raw`] projects them once into the
//! canonical shape used everywhere else: the primary key lives in
//! [`Record::id`] and is never duplicated inside `fields`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Canonical name of the primary key attribute on records and documents.
pub const ID_FIELD: &str = "ID";

/// Name of the flattened metadata sub-mapping on documents.
pub const META_FIELD: &str = "meta";

/// Name of the content type attribute on documents.
pub const DOC_TYPE_FIELD: &str = "doc_type";

/// Attribute names owned by the document envelope. Store columns with these
/// names never reach a document.
pub const RESERVED_FIELDS: [&str; 3] = [ID_FIELD, META_FIELD, DOC_TYPE_FIELD];

/// A store-native row, keyed by the store's own column names.
pub type RawRecord = Map<String, Value>;

/// Metadata as returned by the store: every key may hold several values,
/// in store order.
pub type MetadataValues = BTreeMap<String, Vec<Value>>;

/// Identifier of a record, unique within its content type.
///
/// Integers compare numerically and strings lexically; every integer sorts
/// below every string so "descending primary key" is total.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Str(String),
}

impl RecordId {
    /// Resolve an id from a JSON value.
    ///
    /// Numeric strings are folded into `Int` so that `"12"` and `12` name the
    /// same record. Returns `None` for null, zero, empty strings and
    /// non-scalar values.
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = match value {
            Value::Number(n) => RecordId::Int(n.as_i64()?),
            Value::String(s) => s.parse::<RecordId>().ok()?,
            _ => return None,
        };
        if id.is_empty() {
            None
        } else {
            Some(id)
        }
    }

    /// Whether this id is the "no id" sentinel (`0` or `""`).
    pub fn is_empty(&self) -> bool {
        match self {
            RecordId::Int(n) => *n == 0,
            RecordId::Str(s) => s.is_empty(),
        }
    }

    /// JSON form of the id, used when writing documents.
    pub fn to_value(&self) -> Value {
        match self {
            RecordId::Int(n) => Value::from(*n),
            RecordId::Str(s) => Value::from(s.clone()),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(n) => write!(f, "{}", n),
            RecordId::Str(s) => write!(f, "{}", s),
        }
    }
}

impl FromStr for RecordId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match trimmed.parse::<i64>() {
            Ok(n) => RecordId::Int(n),
            Err(_) => RecordId::Str(trimmed.to_string()),
        })
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        RecordId::Int(n)
    }
}

impl From<&str> for RecordId {
    /// Numeric strings fold into `Int`, matching [`RecordId::from_value`].
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(id) => id,
            Err(never) => match never {},
        }
    }
}

/// A row projected into canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Canonical primary key.
    #[serde(rename = "ID")]
    pub id: RecordId,
    /// Remaining attributes, with the store-native key removed.
    pub fields: Map<String, Value>,
}

impl Record {
    /// Project a raw row, moving `primary_key` into [`Record::id`].
    ///
    /// Returns `None` when the row has no usable identifier. Columns named
    /// after [`RESERVED_FIELDS`] are dropped so they cannot shadow the
    /// canonical attributes on the resulting document.
    pub fn from_raw(mut raw: RawRecord, primary_key: &str) -> Option<Self> {
        let id = raw
            .remove(primary_key)
            .as_ref()
            .and_then(RecordId::from_value)?;
        for name in RESERVED_FIELDS {
            raw.remove(name);
        }
        Some(Self { id, fields: raw })
    }

    /// Get a string attribute.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}
