//! Bulk sync E2E tests.
//!
//! Paged reindex from the RocksDB store into the Tantivy index.

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use e2e_tests::TestHarness;
use sync_daemon::seed_records;
use sync_indexing::{StoreBinding, SyncOptions, TypeBinding};
use sync_search::SearchOptions;
use sync_storage::{InMemoryRecordStore, RecordWriter};
use sync_types::{RecordId, SyncMode, TriggerKind};

/// 25 comments at 10 per page: three pages, everything submitted.
#[tokio::test]
async fn test_full_sync_of_25_comments() {
    let harness = TestHarness::new();
    harness.seed_comments(1..=25);

    let report = harness
        .synchronizer
        .sync_all(SyncOptions::default().with_per_page(10))
        .await;

    let comments = report.type_report("comment").unwrap();
    assert_eq!(comments.total, 25);
    assert_eq!(comments.pages, 3);
    assert_eq!(report.submitted, 25);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.failed, 0);
    assert!(report.errors.is_empty());
    assert_eq!(harness.searcher().count(), 25);
}

/// Pending mode pages ids and fetches each comment.
#[tokio::test]
async fn test_pending_sync() {
    let harness = TestHarness::new();
    harness.seed_comments(1..=12);
    harness.put_comment_meta(4, 1, "pinned", json!("yes"));

    let report = harness
        .synchronizer
        .sync_all(
            SyncOptions::default()
                .with_per_page(5)
                .with_mode(SyncMode::Pending),
        )
        .await;

    assert_eq!(report.submitted, 12);
    assert_eq!(report.type_report("comment").unwrap().pages, 3);
    assert_eq!(harness.indexed_comment(4).unwrap()["meta"], json!({"pinned": "yes"}));
    assert_eq!(harness.indexed_comment(5).unwrap()["meta"], json!({}));
}

/// Pages from the RocksDB store are disjoint and in descending id order.
#[test]
fn test_rocksdb_pagination_contract() {
    let harness = TestHarness::new();
    harness.seed_comments(1..=23);
    let binding = harness.synchronizer.registry().get("comment").unwrap();

    let page1 = binding.get_items_ids(1, 10).unwrap();
    let page2 = binding.get_items_ids(2, 10).unwrap();
    let first20 = binding.get_items_ids(0, 20).unwrap();
    assert_eq!(page1[0], RecordId::Int(23));
    assert_eq!([page1.clone(), page2].concat(), first20);
    assert_eq!(binding.get_items_ids(0, 10).unwrap(), page1);

    let mut seen = HashSet::new();
    let mut page = 1;
    loop {
        let ids = binding.get_items_ids(page, 7).unwrap();
        if ids.is_empty() {
            break;
        }
        seen.extend(ids);
        page += 1;
    }
    assert_eq!(seen.len() as u64, binding.get_items_count().unwrap());
}

/// A failing type reports its error while the comment sync completes.
#[tokio::test]
async fn test_failing_type_does_not_abort_siblings() {
    let mut harness = TestHarness::new();
    harness.seed_comments(1..=6);

    let posts = Arc::new(InMemoryRecordStore::new());
    let row = json!({"post_id": 1, "title": "hello"}).as_object().cloned().unwrap();
    posts.put_record("post", &RecordId::Int(1), &row).unwrap();
    posts.fail_queries("post");
    harness.synchronizer.register_type(Arc::new(
        StoreBinding::new("post", "post_id", posts).with_hook("save_post", TriggerKind::Index),
    ));

    let report = harness.synchronizer.sync_all(SyncOptions::default()).await;

    assert_eq!(report.submitted, 6);
    assert!(report.type_report("comment").unwrap().completed());
    assert!(report.type_report("post").unwrap().fatal.is_some());
    assert_eq!(report.errors.len(), 1);
    assert_eq!(harness.searcher().count(), 6);
}

/// A run cancelled up front leaves the index untouched.
#[tokio::test]
async fn test_cancelled_sync_submits_nothing() {
    let harness = TestHarness::new();
    harness.seed_comments(1..=5);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = harness
        .synchronizer
        .sync_all_with_cancel(SyncOptions::default(), cancel)
        .await;

    assert!(report.cancelled);
    assert_eq!(report.submitted, 0);
    assert_eq!(harness.searcher().count(), 0);
}

/// Seeded JSON Lines rows are searchable after a reindex.
#[tokio::test]
async fn test_seed_reindex_search() {
    let harness = TestHarness::new();
    let input = concat!(
        r#"{"comment_ID": "1", "comment_date": "2024-01-29 15:00:00", "comment_content": "Rust ownership keeps memory safe"}"#,
        "\n",
        r#"{"comment_ID": "2", "comment_date": "2024-01-29 15:01:00", "comment_content": "Gardening in spring", "meta": [{"meta_id": 5, "key": "topic", "value": "plants"}]}"#,
        "\n",
    );
    let stats = seed_records(
        harness.storage.as_ref(),
        "comment",
        "comment_ID",
        Cursor::new(input),
    )
    .unwrap();
    assert_eq!(stats.records, 2);

    let report = harness.synchronizer.sync_all(SyncOptions::default()).await;
    assert_eq!(report.submitted, 2);

    let searcher = harness.searcher();
    let hits = searcher.search("ownership", SearchOptions::default()).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].doc_id, "1");

    let hits = searcher
        .search("plants", SearchOptions::default().with_doc_type("comment"))
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].doc_id, "2");
}
