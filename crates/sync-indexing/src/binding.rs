//! The contract every indexable content type implements.

use tracing::{debug, warn};

use sync_storage::{RecordStore, StorageError};
use sync_types::{Action, Document, RawRecord, RecordId, TriggerKind, TriggerPayload};

use crate::error::NormalizationError;
use crate::normalizer::ItemRef;

/// A hook name and the trigger category it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hook {
    pub name: String,
    pub kind: TriggerKind,
}

impl Hook {
    pub fn new(name: impl Into<String>, kind: TriggerKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Adapter between one content type in the record store and the index.
///
/// Bindings are shared across threads: the registry hands them to the
/// router, to every sync cycle and to the bulk driver.
pub trait TypeBinding: Send + Sync {
    /// Content type name, also used as `doc_type` on documents.
    fn name(&self) -> &str;

    /// Store-native name of the primary-key attribute.
    fn primary_key(&self) -> &str;

    /// Hook names this type listens to.
    fn hooks(&self) -> &[Hook];

    /// Resolve an insert/update notification.
    fn resolve_index(&self, payload: &TriggerPayload) -> Option<Action>;

    /// Resolve a delete notification.
    ///
    /// Uses the id carried by the payload; the record is already gone.
    fn resolve_delete(&self, payload: &TriggerPayload) -> Option<Action> {
        if payload.record_id.is_empty() {
            return None;
        }
        Some(Action::delete(self.name(), payload.record_id.clone()))
    }

    /// Resolve a metadata notification to a reindex of the owning record.
    ///
    /// Never produces a delete.
    fn resolve_metadata(&self, kind: TriggerKind, payload: &TriggerPayload) -> Option<Action>;

    /// Turn an id or a prefetched row into a document.
    fn normalize(&self, item: ItemRef) -> Result<Document, NormalizationError>;

    /// Rows in descending primary-key order for a 1-based page.
    fn get_items(&self, page: i64, per_page: u64) -> Result<Vec<RawRecord>, StorageError>;

    /// Ids in descending primary-key order for a 1-based page.
    fn get_items_ids(&self, page: i64, per_page: u64) -> Result<Vec<RecordId>, StorageError>;

    /// Number of rows `get_items` can yield.
    fn get_items_count(&self) -> Result<u64, StorageError>;

    /// Route a trigger of any category.
    fn resolve(&self, kind: TriggerKind, payload: &TriggerPayload) -> Option<Action> {
        match kind {
            TriggerKind::Index => self.resolve_index(payload),
            TriggerKind::Delete => self.resolve_delete(payload),
            TriggerKind::MetadataAdded | TriggerKind::MetadataChanged => {
                self.resolve_metadata(kind, payload)
            }
        }
    }
}

/// Owning record of a metadata trigger.
///
/// An added row always names its owner. For an updated or deleted row the
/// owner falls back to the store's metadata index when the payload lacks it.
pub fn metadata_owner(
    store: &dyn RecordStore,
    doc_type: &str,
    kind: TriggerKind,
    payload: &TriggerPayload,
) -> Option<RecordId> {
    let owner = match (&payload.owning_id, kind) {
        (Some(owner), _) => Some(owner.clone()),
        (None, TriggerKind::MetadataChanged) => store
            .metadata_owner(doc_type, &payload.record_id)
            .unwrap_or_else(|e| {
                warn!(
                    doc_type,
                    meta_id = %payload.record_id,
                    error = %e,
                    "Could not resolve metadata owner"
                );
                None
            }),
        (None, _) => None,
    };

    let owner = owner.filter(|id| !id.is_empty());
    if owner.is_none() {
        debug!(
            doc_type,
            meta_id = %payload.record_id,
            kind = ?kind,
            "Metadata trigger without owner"
        );
    }
    owner
}
