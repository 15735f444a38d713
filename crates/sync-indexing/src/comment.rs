//! Reference binding for comments.

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde_json::Value;
use tracing::{debug, warn};

use sync_storage::{RecordStore, StorageError};
use sync_types::{Action, Document, RawRecord, RecordId, TriggerKind, TriggerPayload};

use crate::binding::{metadata_owner, Hook, TypeBinding};
use crate::error::NormalizationError;
use crate::normalizer::{DocumentFilter, ItemRef, KeepAllFields, Normalizer};
use crate::pagination::{fetch_page, fetch_page_ids};

/// Content type name of comments.
pub const COMMENT_TYPE: &str = "comment";

/// Store-native primary key of comment rows.
pub const COMMENT_PRIMARY_KEY: &str = "comment_ID";

/// Store format of `comment_date`.
const COMMENT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const COMMENT_HOOKS: &[(&str, TriggerKind)] = &[
    ("wp_insert_comment", TriggerKind::Index),
    ("edit_comment", TriggerKind::Index),
    ("deleted_comment", TriggerKind::Delete),
    ("added_comment_meta", TriggerKind::MetadataAdded),
    ("updated_comment_meta", TriggerKind::MetadataChanged),
    ("deleted_comment_meta", TriggerKind::MetadataChanged),
];

/// Binding for the `comment` content type.
pub struct CommentBinding {
    store: Arc<dyn RecordStore>,
    filter: Arc<dyn DocumentFilter>,
    hooks: Vec<Hook>,
}

impl CommentBinding {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            filter: Arc::new(KeepAllFields),
            hooks: COMMENT_HOOKS
                .iter()
                .map(|(name, kind)| Hook::new(*name, *kind))
                .collect(),
        }
    }

    /// Replace the final field filter.
    pub fn with_filter(mut self, filter: Arc<dyn DocumentFilter>) -> Self {
        self.filter = filter;
        self
    }

    fn normalizer(&self) -> Normalizer<'_> {
        Normalizer::new(self.store.as_ref(), COMMENT_TYPE, COMMENT_PRIMARY_KEY)
    }
}

/// Seconds since the epoch for a `comment_date` value, read as UTC.
pub fn parse_comment_date(value: &str) -> Option<i64> {
    NaiveDateTime::parse_from_str(value.trim(), COMMENT_DATE_FORMAT)
        .ok()
        .map(|dt| dt.and_utc().timestamp())
}

fn add_date_timestamp(document: &mut Document) {
    let timestamp = document
        .field("comment_date")
        .and_then(Value::as_str)
        .and_then(parse_comment_date);

    match timestamp {
        Some(ts) => document.set_field("comment_date_timestamp", Value::from(ts)),
        None => debug!(key = %document.key(), "No parsable comment_date"),
    }
}

impl TypeBinding for CommentBinding {
    fn name(&self) -> &str {
        COMMENT_TYPE
    }

    fn primary_key(&self) -> &str {
        COMMENT_PRIMARY_KEY
    }

    fn hooks(&self) -> &[Hook] {
        &self.hooks
    }

    fn resolve_index(&self, payload: &TriggerPayload) -> Option<Action> {
        let id = &payload.record_id;
        if id.is_empty() {
            return None;
        }

        match self.store.fetch_record(COMMENT_TYPE, id) {
            Ok(Some(_)) => Some(Action::index(COMMENT_TYPE, id.clone())),
            Ok(None) => {
                debug!(id = %id, "Comment no longer exists, dropping index trigger");
                None
            }
            Err(e) => {
                // The flush normalizes again, so an unverified id is still queued
                warn!(id = %id, error = %e, "Could not check comment existence");
                Some(Action::index(COMMENT_TYPE, id.clone()))
            }
        }
    }

    fn resolve_metadata(&self, kind: TriggerKind, payload: &TriggerPayload) -> Option<Action> {
        let owner = metadata_owner(self.store.as_ref(), COMMENT_TYPE, kind, payload)?;
        self.resolve_index(&TriggerPayload::record(owner))
    }

    fn normalize(&self, item: ItemRef) -> Result<Document, NormalizationError> {
        self.normalizer()
            .normalize(item, add_date_timestamp, self.filter.as_ref())
    }

    fn get_items(&self, page: i64, per_page: u64) -> Result<Vec<RawRecord>, StorageError> {
        fetch_page(self.store.as_ref(), COMMENT_TYPE, page, per_page)
    }

    fn get_items_ids(&self, page: i64, per_page: u64) -> Result<Vec<RecordId>, StorageError> {
        fetch_page_ids(self.store.as_ref(), COMMENT_TYPE, page, per_page)
    }

    fn get_items_count(&self) -> Result<u64, StorageError> {
        self.store.count(COMMENT_TYPE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;
    use sync_storage::{InMemoryRecordStore, RecordWriter};
    use sync_types::ActionKind;

    fn comment_row(id: i64) -> RawRecord {
        json!({
            "comment_ID": id,
            "comment_post_ID": 1,
            "comment_author": "Ada",
            "comment_date": "2023-11-14 22:13:20",
            "comment_content": format!("comment {}", id),
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    fn seeded(count: i64) -> (Arc<InMemoryRecordStore>, CommentBinding) {
        let store = Arc::new(InMemoryRecordStore::new());
        for id in 1..=count {
            store
                .put_record(COMMENT_TYPE, &RecordId::Int(id), &comment_row(id))
                .unwrap();
        }
        let binding = CommentBinding::new(store.clone());
        (store, binding)
    }

    #[test]
    fn test_normalize_canonicalizes_id() {
        let (_store, binding) = seeded(3);
        let doc = binding.normalize(ItemRef::Id(RecordId::Int(2))).unwrap();

        assert_eq!(doc.id, RecordId::Int(2));
        assert_eq!(doc.doc_type, "comment");
        assert!(doc.field("comment_ID").is_none());
        assert_eq!(doc.field("comment_date_timestamp"), Some(&json!(1_700_000_000)));
    }

    #[test]
    fn test_meta_present_when_empty() {
        let (_store, binding) = seeded(1);
        let doc = binding.normalize(ItemRef::Id(RecordId::Int(1))).unwrap();

        assert!(doc.meta.is_empty());
        assert_eq!(doc.to_json().unwrap()["meta"], json!({}));
    }

    #[test]
    fn test_meta_keeps_first_value() {
        let (store, binding) = seeded(1);
        let owner = RecordId::Int(1);
        store
            .put_metadata(COMMENT_TYPE, &owner, &RecordId::Int(10), "rating", json!("5"))
            .unwrap();
        store
            .put_metadata(COMMENT_TYPE, &owner, &RecordId::Int(11), "rating", json!("2"))
            .unwrap();

        let doc = binding.normalize(ItemRef::Id(owner)).unwrap();
        assert_eq!(doc.meta.get("rating"), Some(&json!("5")));
    }

    #[test]
    fn test_unparsable_date_is_left_out() {
        let (_store, binding) = seeded(0);
        let mut row = comment_row(4);
        row.insert("comment_date".to_string(), json!("0000-00-00 00:00:00"));

        let doc = binding.normalize(ItemRef::Record(row)).unwrap();
        assert!(doc.field("comment_date_timestamp").is_none());
        assert_eq!(doc.id, RecordId::Int(4));
    }

    #[test]
    fn test_parse_comment_date() {
        assert_eq!(parse_comment_date("1970-01-01 00:01:00"), Some(60));
        assert_eq!(parse_comment_date("not a date"), None);
    }

    #[test]
    fn test_index_trigger_requires_existing_record() {
        let (_store, binding) = seeded(2);

        let action = binding.resolve_index(&TriggerPayload::record(2i64)).unwrap();
        assert_eq!(action, Action::index(COMMENT_TYPE, RecordId::Int(2)));

        assert!(binding.resolve_index(&TriggerPayload::record(99i64)).is_none());
        assert!(binding.resolve_index(&TriggerPayload::record(0i64)).is_none());
    }

    #[test]
    fn test_delete_trigger_uses_payload_id() {
        let (_store, binding) = seeded(0);
        let action = binding
            .resolve(TriggerKind::Delete, &TriggerPayload::record(42i64))
            .unwrap();
        assert_eq!(action.kind, ActionKind::DeleteItem);
        assert_eq!(action.id, RecordId::Int(42));
    }

    #[test]
    fn test_metadata_trigger_targets_owner() {
        let (store, binding) = seeded(7);

        let action = binding
            .resolve(TriggerKind::MetadataChanged, &TriggerPayload::metadata(99i64, 7i64))
            .unwrap();
        assert_eq!(action, Action::index(COMMENT_TYPE, RecordId::Int(7)));

        store
            .put_metadata(COMMENT_TYPE, &RecordId::Int(3), &RecordId::Int(50), "k", json!("v"))
            .unwrap();
        let action = binding
            .resolve(TriggerKind::MetadataChanged, &TriggerPayload::metadata_row(50i64))
            .unwrap();
        assert_eq!(action, Action::index(COMMENT_TYPE, RecordId::Int(3)));

        assert!(binding
            .resolve(TriggerKind::MetadataChanged, &TriggerPayload::metadata_row(51i64))
            .is_none());
    }

    #[test]
    fn test_string_id_trigger_matches_stored_comment() {
        let (_store, binding) = seeded(12);
        let action = binding
            .resolve(TriggerKind::Index, &TriggerPayload::record("12"))
            .unwrap();
        assert_eq!(action, Action::index(COMMENT_TYPE, RecordId::Int(12)));
    }

    #[test]
    fn test_metadata_trigger_for_missing_owner_is_dropped() {
        let (_store, binding) = seeded(3);
        for kind in [TriggerKind::MetadataAdded, TriggerKind::MetadataChanged] {
            assert!(binding
                .resolve(kind, &TriggerPayload::metadata(99i64, 404i64))
                .is_none());
        }
    }

    #[test]
    fn test_added_metadata_uses_payload_owner_only() {
        let (store, binding) = seeded(3);
        store
            .put_metadata(COMMENT_TYPE, &RecordId::Int(3), &RecordId::Int(50), "k", json!("v"))
            .unwrap();

        assert!(binding
            .resolve(TriggerKind::MetadataAdded, &TriggerPayload::metadata_row(50i64))
            .is_none());
        assert_eq!(
            binding.resolve(TriggerKind::MetadataAdded, &TriggerPayload::metadata(50i64, 3i64)),
            Some(Action::index(COMMENT_TYPE, RecordId::Int(3)))
        );
    }

    #[test]
    fn test_pages_are_disjoint_prefix() {
        let (_store, binding) = seeded(25);
        let ids = |rows: Vec<RawRecord>| -> Vec<Value> {
            rows.into_iter().map(|r| r["comment_ID"].clone()).collect()
        };

        let page1 = ids(binding.get_items(1, 10).unwrap());
        let page2 = ids(binding.get_items(2, 10).unwrap());
        let first20 = ids(binding.get_items(1, 20).unwrap());

        assert_eq!(page1.len(), 10);
        assert_eq!(page1[0], json!(25));
        let mut joined = page1.clone();
        joined.extend(page2);
        assert_eq!(joined, first20);

        assert_eq!(ids(binding.get_items(0, 10).unwrap()), page1);
        assert!(binding.get_items(1, 0).unwrap().is_empty());
    }

    #[test]
    fn test_count_matches_exhaustive_id_paging() {
        let (_store, binding) = seeded(23);
        for per_page in [1, 4, 10, 50] {
            let mut seen = HashSet::new();
            let mut page = 1;
            loop {
                let ids = binding.get_items_ids(page, per_page).unwrap();
                if ids.is_empty() {
                    break;
                }
                seen.extend(ids);
                page += 1;
            }
            assert_eq!(seen.len() as u64, binding.get_items_count().unwrap());
        }
    }
}
