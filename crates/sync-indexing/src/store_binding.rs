//! Generic binding for content types that need no derived fields.

use std::sync::Arc;

use tracing::{debug, warn};

use sync_storage::{RecordStore, StorageError};
use sync_types::{Action, Document, RawRecord, RecordId, TriggerKind, TriggerPayload};

use crate::binding::{metadata_owner, Hook, TypeBinding};
use crate::error::NormalizationError;
use crate::normalizer::{DocumentFilter, ItemRef, KeepAllFields, Normalizer};
use crate::pagination::{fetch_page, fetch_page_ids};

/// A content type read straight from the record store.
///
/// Index and metadata triggers are dropped when the target record is gone.
pub struct StoreBinding {
    name: String,
    primary_key: String,
    store: Arc<dyn RecordStore>,
    filter: Arc<dyn DocumentFilter>,
    hooks: Vec<Hook>,
}

impl StoreBinding {
    pub fn new(
        name: impl Into<String>,
        primary_key: impl Into<String>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            name: name.into(),
            primary_key: primary_key.into(),
            store,
            filter: Arc::new(KeepAllFields),
            hooks: Vec::new(),
        }
    }

    /// Listen to a hook.
    pub fn with_hook(mut self, name: impl Into<String>, kind: TriggerKind) -> Self {
        self.hooks.push(Hook::new(name, kind));
        self
    }

    /// Replace the final field filter.
    pub fn with_filter(mut self, filter: Arc<dyn DocumentFilter>) -> Self {
        self.filter = filter;
        self
    }
}

impl TypeBinding for StoreBinding {
    fn name(&self) -> &str {
        &self.name
    }

    fn primary_key(&self) -> &str {
        &self.primary_key
    }

    fn hooks(&self) -> &[Hook] {
        &self.hooks
    }

    fn resolve_index(&self, payload: &TriggerPayload) -> Option<Action> {
        let id = &payload.record_id;
        if id.is_empty() {
            return None;
        }
        match self.store.fetch_record(&self.name, id) {
            Ok(Some(_)) => Some(Action::index(&self.name, id.clone())),
            Ok(None) => {
                debug!(
                    doc_type = %self.name,
                    id = %id,
                    "Record no longer exists, dropping index trigger"
                );
                None
            }
            Err(e) => {
                warn!(
                    doc_type = %self.name,
                    id = %id,
                    error = %e,
                    "Could not check record existence"
                );
                Some(Action::index(&self.name, id.clone()))
            }
        }
    }

    fn resolve_metadata(&self, kind: TriggerKind, payload: &TriggerPayload) -> Option<Action> {
        let owner = metadata_owner(self.store.as_ref(), &self.name, kind, payload)?;
        self.resolve_index(&TriggerPayload::record(owner))
    }

    fn normalize(&self, item: ItemRef) -> Result<Document, NormalizationError> {
        Normalizer::new(self.store.as_ref(), &self.name, &self.primary_key).normalize(
            item,
            |_| {},
            self.filter.as_ref(),
        )
    }

    fn get_items(&self, page: i64, per_page: u64) -> Result<Vec<RawRecord>, StorageError> {
        fetch_page(self.store.as_ref(), &self.name, page, per_page)
    }

    fn get_items_ids(&self, page: i64, per_page: u64) -> Result<Vec<RecordId>, StorageError> {
        fetch_page_ids(self.store.as_ref(), &self.name, page, per_page)
    }

    fn get_items_count(&self) -> Result<u64, StorageError> {
        self.store.count(&self.name)
    }
}
