//! Fixtures for unit tests.

use std::ops::RangeInclusive;
use std::sync::Arc;

use serde_json::json;

use sync_storage::{InMemoryRecordStore, RecordWriter};
use sync_types::{RawRecord, RecordId, TriggerKind};

use crate::binding::TypeBinding;
use crate::store_binding::StoreBinding;

pub(crate) fn row(doc_type: &str, id: i64) -> RawRecord {
    json!({"id": id, "title": format!("{} {}", doc_type, id)})
        .as_object()
        .cloned()
        .unwrap()
}

/// Seed `ids` into `store` under `doc_type`.
pub(crate) fn seed(store: &InMemoryRecordStore, doc_type: &str, ids: RangeInclusive<i64>) {
    for id in ids {
        store
            .put_record(doc_type, &RecordId::Int(id), &row(doc_type, id))
            .unwrap();
    }
}

/// Binding over `store` with `save_`, `delete_` and `update_*_meta` hooks.
pub(crate) fn store_binding(store: Arc<InMemoryRecordStore>, doc_type: &str) -> StoreBinding {
    StoreBinding::new(doc_type, "id", store)
        .with_hook(format!("save_{}", doc_type), TriggerKind::Index)
        .with_hook(format!("delete_{}", doc_type), TriggerKind::Delete)
        .with_hook(format!("update_{}_meta", doc_type), TriggerKind::MetadataChanged)
}

/// Binding over a fresh store holding `ids`.
pub(crate) fn binding(doc_type: &str, ids: RangeInclusive<i64>) -> Arc<dyn TypeBinding> {
    let store = Arc::new(InMemoryRecordStore::new());
    seed(&store, doc_type, ids);
    Arc::new(store_binding(store, doc_type))
}
