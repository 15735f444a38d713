//! Incremental sync E2E tests.
//!
//! Hook triggers against the RocksDB store, flushed into the Tantivy index.

use pretty_assertions::assert_eq;
use serde_json::json;

use e2e_tests::TestHarness;
use sync_storage::RecordWriter;
use sync_types::{Action, RecordId, TieBreak, TriggerPayload};

/// Insert, edit and delete hooks keep the index in step with the store.
#[tokio::test]
async fn test_insert_edit_delete_lifecycle() {
    let harness = TestHarness::new();
    harness.put_comment(12, "first version");

    let mut cycle = harness.synchronizer.begin_cycle();
    cycle.trigger("wp_insert_comment", TriggerPayload::record(12i64));
    let report = cycle.flush_deferred().await.unwrap();
    assert_eq!(report.submitted(), 1);

    let body = harness.indexed_comment(12).unwrap();
    assert_eq!(body["ID"], json!(12));
    assert_eq!(body["doc_type"], json!("comment"));
    assert_eq!(body["comment_content"], json!("first version"));
    assert_eq!(body["comment_date_timestamp"], json!(1_706_540_400));
    assert_eq!(body["meta"], json!({}));
    assert!(body.get("comment_ID").is_none());

    harness.put_comment(12, "second version");
    let mut cycle = harness.synchronizer.begin_cycle();
    // Hosts pass ids as strings
    let queued = cycle.trigger("edit_comment", TriggerPayload::record("12"));
    assert_eq!(queued, 1);
    cycle.flush();
    assert_eq!(
        harness.indexed_comment(12).unwrap()["comment_content"],
        json!("second version")
    );
    assert_eq!(harness.searcher().count(), 1);

    harness
        .storage
        .delete_record("comment", &RecordId::Int(12))
        .unwrap();
    let mut cycle = harness.synchronizer.begin_cycle();
    cycle.trigger("deleted_comment", TriggerPayload::record(12i64));
    let report = cycle.flush();
    assert_eq!(report.deleted(), 1);
    assert!(harness.indexed_comment(12).is_none());
}

/// Repeated hooks in one cycle collapse into one submission.
#[tokio::test]
async fn test_repeated_triggers_submit_once() {
    let harness = TestHarness::new();
    harness.put_comment(5, "dedup me");

    let mut cycle = harness.synchronizer.begin_cycle();
    cycle.trigger("edit_comment", TriggerPayload::record(5i64));
    cycle.trigger("edit_comment", TriggerPayload::record(5i64));
    cycle.trigger("wp_insert_comment", TriggerPayload::record(5i64));
    assert_eq!(cycle.pending().len(), 1);

    let report = cycle.flush();
    assert_eq!(report.submitted(), 1);
    assert_eq!(harness.searcher().count(), 1);
}

/// An edit followed by a delete of the same comment leaves only the delete.
#[tokio::test]
async fn test_delete_takes_precedence() {
    let harness = TestHarness::new();
    harness.put_comment(5, "soon gone");

    let mut cycle = harness.synchronizer.begin_cycle();
    cycle.trigger("edit_comment", TriggerPayload::record(5i64));
    cycle.trigger("deleted_comment", TriggerPayload::record(5i64));
    assert_eq!(cycle.pending(), &[Action::delete("comment", RecordId::Int(5))]);

    let report = cycle.flush();
    assert_eq!(report.submitted(), 0);
    assert_eq!(report.deleted(), 1);
    assert!(harness.indexed_comment(5).is_none());
}

/// With last-wins, a re-index after a delete in the same cycle is kept.
#[tokio::test]
async fn test_last_wins_tie_break() {
    let harness = TestHarness::with_tie_break(TieBreak::LastWins);
    harness.put_comment(5, "restored");

    let mut cycle = harness.synchronizer.begin_cycle();
    cycle.enqueue(Action::delete("comment", RecordId::Int(5)));
    cycle.trigger("edit_comment", TriggerPayload::record(5i64));

    let report = cycle.flush();
    assert_eq!(report.submitted(), 1);
    assert!(harness.indexed_comment(5).is_some());
}

/// Metadata hooks reindex the owning comment with flattened metadata.
#[tokio::test]
async fn test_metadata_trigger_reindexes_owner() {
    let harness = TestHarness::new();
    harness.put_comment(7, "has meta");
    harness.put_comment_meta(7, 98, "rating", json!("5"));
    harness.put_comment_meta(7, 99, "rating", json!("1"));
    harness.put_comment_meta(7, 100, "flag", json!("spam"));

    let mut cycle = harness.synchronizer.begin_cycle();
    cycle.trigger("updated_comment_meta", TriggerPayload::metadata(99i64, 7i64));
    assert_eq!(cycle.pending(), &[Action::index("comment", RecordId::Int(7))]);
    cycle.flush();

    let body = harness.indexed_comment(7).unwrap();
    assert_eq!(body["meta"], json!({"flag": "spam", "rating": "5"}));
}

/// Without an owning id, the owner is looked up from the metadata row.
#[tokio::test]
async fn test_metadata_owner_resolved_from_store() {
    let harness = TestHarness::new();
    harness.put_comment(3, "owner");
    harness.put_comment_meta(3, 40, "mood", json!("calm"));

    let mut cycle = harness.synchronizer.begin_cycle();
    let queued = cycle.trigger("deleted_comment_meta", TriggerPayload::metadata_row(40i64));
    assert_eq!(queued, 1);
    assert_eq!(cycle.pending(), &[Action::index("comment", RecordId::Int(3))]);
}

/// A comment deleted between trigger and flush is skipped, not submitted.
#[tokio::test]
async fn test_deleted_before_flush_is_skipped() {
    let harness = TestHarness::new();
    harness.put_comment(9, "short lived");

    let mut cycle = harness.synchronizer.begin_cycle();
    cycle.trigger("edit_comment", TriggerPayload::record(9i64));
    harness
        .storage
        .delete_record("comment", &RecordId::Int(9))
        .unwrap();

    let report = cycle.flush();
    assert_eq!(report.skipped(), 1);
    assert_eq!(report.submitted(), 0);
    assert!(harness.indexed_comment(9).is_none());
}

/// Index hooks for comments that do not exist queue nothing.
#[tokio::test]
async fn test_trigger_for_missing_comment_is_dropped() {
    let harness = TestHarness::new();

    let mut cycle = harness.synchronizer.begin_cycle();
    assert_eq!(cycle.trigger("edit_comment", TriggerPayload::record(404i64)), 0);
    assert_eq!(cycle.trigger("publish_post", TriggerPayload::record(1i64)), 0);
    assert!(cycle.pending().is_empty());
}
