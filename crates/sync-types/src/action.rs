//! Pending index actions and the triggers that produce them.

use serde::{Deserialize, Serialize};

use crate::record::RecordId;

/// Operation requested against the index backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// (Re)index the record
    IndexItem,
    /// Remove the record from the index
    DeleteItem,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionKind::IndexItem => write!(f, "index_item"),
            ActionKind::DeleteItem => write!(f, "delete_item"),
        }
    }
}

/// A pending operation on a single record of one content type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    /// Content type the target belongs to
    pub doc_type: String,
    /// What to do
    pub kind: ActionKind,
    /// Target record
    pub id: RecordId,
}

impl Action {
    /// Create an `index_item` action.
    pub fn index(doc_type: impl Into<String>, id: RecordId) -> Self {
        Self {
            doc_type: doc_type.into(),
            kind: ActionKind::IndexItem,
            id,
        }
    }

    /// Create a `delete_item` action.
    pub fn delete(doc_type: impl Into<String>, id: RecordId) -> Self {
        Self {
            doc_type: doc_type.into(),
            kind: ActionKind::DeleteItem,
            id,
        }
    }
}

/// Category a hook name resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Record inserted or updated
    Index,
    /// Record deleted
    Delete,
    /// Metadata row added; the payload carries the owning record id
    MetadataAdded,
    /// Metadata row updated or deleted; the owning id may have to be
    /// derived from the metadata row
    MetadataChanged,
}

impl TriggerKind {
    /// Whether this trigger concerns a metadata row rather than a record.
    pub fn is_metadata(&self) -> bool {
        matches!(self, TriggerKind::MetadataAdded | TriggerKind::MetadataChanged)
    }
}

/// Minimal payload delivered with a mutation notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerPayload {
    /// Record id, or metadata row id for metadata triggers
    pub record_id: RecordId,
    /// Owning record id for metadata triggers, when the source knows it
    #[serde(default)]
    pub owning_id: Option<RecordId>,
}

impl TriggerPayload {
    /// Payload for a record-level trigger.
    pub fn record(record_id: impl Into<RecordId>) -> Self {
        Self {
            record_id: record_id.into(),
            owning_id: None,
        }
    }

    /// Payload for a metadata trigger.
    pub fn metadata(meta_id: impl Into<RecordId>, owning_id: impl Into<RecordId>) -> Self {
        Self {
            record_id: meta_id.into(),
            owning_id: Some(owning_id.into()),
        }
    }

    /// Payload for a metadata trigger where only the metadata row is known.
    pub fn metadata_row(meta_id: impl Into<RecordId>) -> Self {
        Self {
            record_id: meta_id.into(),
            owning_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&ActionKind::IndexItem).unwrap(),
            "\"index_item\""
        );
        assert_eq!(ActionKind::DeleteItem.to_string(), "delete_item");
    }

    #[test]
    fn test_payload_constructors() {
        let payload = TriggerPayload::metadata(99i64, 7i64);
        assert_eq!(payload.record_id, RecordId::Int(99));
        assert_eq!(payload.owning_id, Some(RecordId::Int(7)));

        let payload = TriggerPayload::metadata_row(99i64);
        assert!(payload.owning_id.is_none());
    }

    #[test]
    fn test_trigger_kind_is_metadata() {
        assert!(TriggerKind::MetadataAdded.is_metadata());
        assert!(TriggerKind::MetadataChanged.is_metadata());
        assert!(!TriggerKind::Index.is_metadata());
        assert!(!TriggerKind::Delete.is_metadata());
    }
}
