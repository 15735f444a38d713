//! Index backend trait and per-run outcome counters.
//!
//! The backend receives normalized documents from both the incremental
//! flush and bulk sync. Implementations must be safe to share across
//! threads since distinct content types sync concurrently.

use sync_types::{Document, RecordId};

use crate::error::BackendError;

/// Trait for the search index the core writes to.
///
/// Submit and delete may fail independently; no transactionality is
/// assumed across calls.
pub trait IndexBackend: Send + Sync {
    /// Index a new or updated document, replacing any previous version.
    fn submit(&self, document: &Document) -> Result<(), BackendError>;

    /// Remove a document. Removing an absent document is not an error.
    fn delete(&self, doc_type: &str, id: &RecordId) -> Result<(), BackendError>;

    /// Make pending changes visible.
    fn commit(&self) -> Result<(), BackendError>;

    /// Get the name of this backend for logging.
    fn name(&self) -> &str;
}

/// Outcome counters for a batch of actions or documents.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UpdateResult {
    /// Documents accepted by the backend
    pub submitted: usize,
    /// Deletes accepted by the backend
    pub deleted: usize,
    /// Items dropped because they could not be normalized
    pub skipped: usize,
    /// Items the backend rejected
    pub failed: usize,
}

impl UpdateResult {
    /// Create a new empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted submission.
    pub fn record_success(&mut self) {
        self.submitted += 1;
    }

    /// Record an accepted delete.
    pub fn record_delete(&mut self) {
        self.deleted += 1;
    }

    /// Record a skipped item.
    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    /// Record a backend failure.
    pub fn record_error(&mut self) {
        self.failed += 1;
    }

    /// Merge another result into this one.
    pub fn merge(&mut self, other: &UpdateResult) {
        self.submitted += other.submitted;
        self.deleted += other.deleted;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }

    /// Check if the backend accepted anything.
    pub fn has_updates(&self) -> bool {
        self.submitted > 0 || self.deleted > 0
    }

    /// Total number of items handled.
    pub fn total(&self) -> usize {
        self.submitted + self.deleted + self.skipped + self.failed
    }
}
