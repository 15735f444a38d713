//! End-to-end test infrastructure for content-sync.
//!
//! Provides a shared TestHarness wiring the RocksDB record store, the
//! Tantivy index and the synchronizer together, plus row builders.

use std::ops::RangeInclusive;
use std::sync::Arc;

use serde_json::{json, Value};

use sync_indexing::{CommentBinding, Synchronizer, TantivyBackend, COMMENT_TYPE};
use sync_search::{DocumentSearcher, SearchIndex, SearchIndexer};
use sync_storage::{RecordWriter, Storage};
use sync_types::{IndexSettings, RawRecord, RecordId, TieBreak};

/// Shared test harness for E2E tests.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// RocksDB record store
    pub storage: Arc<Storage>,
    /// Tantivy index the synchronizer writes to
    pub index: SearchIndex,
    /// Synchronizer with the comment binding registered
    pub synchronizer: Synchronizer,
}

impl TestHarness {
    /// Create a harness with the default tie-break.
    pub fn new() -> Self {
        Self::with_tie_break(TieBreak::DeleteWins)
    }

    pub fn with_tie_break(tie_break: TieBreak) -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let storage = Arc::new(
            Storage::open(&temp_dir.path().join("db")).expect("Failed to open test storage"),
        );

        let index = SearchIndex::open(&temp_dir.path().join("index"), &IndexSettings::default())
            .expect("Failed to create index");
        let indexer = Arc::new(SearchIndexer::new(&index).expect("Failed to create indexer"));

        let mut synchronizer =
            Synchronizer::new(Arc::new(TantivyBackend::new(indexer))).with_tie_break(tie_break);
        synchronizer.register_type(Arc::new(CommentBinding::new(storage.clone())));

        Self {
            _temp_dir: temp_dir,
            storage,
            index,
            synchronizer,
        }
    }

    /// Searcher reloaded to the latest commit.
    pub fn searcher(&self) -> DocumentSearcher {
        let searcher = DocumentSearcher::new(&self.index).expect("Failed to create searcher");
        searcher.reload().expect("Failed to reload searcher");
        searcher
    }

    /// Indexed comment body, if any.
    pub fn indexed_comment(&self, id: i64) -> Option<Value> {
        self.searcher()
            .get(COMMENT_TYPE, &RecordId::Int(id))
            .expect("Failed to read index")
    }

    /// Store comments with ids in `ids`.
    pub fn seed_comments(&self, ids: RangeInclusive<i64>) {
        for id in ids {
            self.put_comment(id, &format!("comment number {}", id));
        }
    }

    /// Insert or replace one comment.
    pub fn put_comment(&self, id: i64, content: &str) {
        self.storage
            .put_record(COMMENT_TYPE, &RecordId::Int(id), &comment_row(id, content))
            .expect("Failed to put comment");
    }

    /// Attach a metadata row to a comment.
    pub fn put_comment_meta(&self, owner: i64, meta_id: i64, key: &str, value: Value) {
        self.storage
            .put_metadata(
                COMMENT_TYPE,
                &RecordId::Int(owner),
                &RecordId::Int(meta_id),
                key,
                value,
            )
            .expect("Failed to put metadata");
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// A store-native comment row.
pub fn comment_row(id: i64, content: &str) -> RawRecord {
    json!({
        "comment_ID": id.to_string(),
        "comment_post_ID": "1",
        "comment_author": "Grace Hopper",
        "comment_date": "2024-01-29 15:00:00",
        "comment_content": content,
        "comment_approved": "1",
    })
    .as_object()
    .cloned()
    .expect("comment row is an object")
}
