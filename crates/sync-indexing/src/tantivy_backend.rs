//! Index backend backed by the Tantivy document index.
//!
//! Wraps SearchIndexer from sync-search.

use std::sync::Arc;

use tracing::debug;

use sync_search::SearchIndexer;
use sync_types::{Document, RecordId};

use crate::error::BackendError;
use crate::updater::IndexBackend;

/// Tantivy index backend.
pub struct TantivyBackend {
    indexer: Arc<SearchIndexer>,
}

impl TantivyBackend {
    pub fn new(indexer: Arc<SearchIndexer>) -> Self {
        Self { indexer }
    }

    /// Get the underlying indexer.
    pub fn indexer(&self) -> &Arc<SearchIndexer> {
        &self.indexer
    }
}

impl IndexBackend for TantivyBackend {
    fn submit(&self, document: &Document) -> Result<(), BackendError> {
        self.indexer.index_document(document)?;
        Ok(())
    }

    fn delete(&self, doc_type: &str, id: &RecordId) -> Result<(), BackendError> {
        self.indexer.delete_document(doc_type, id)?;
        Ok(())
    }

    fn commit(&self) -> Result<(), BackendError> {
        let opstamp = self.indexer.commit()?;
        debug!(opstamp, "Tantivy backend committed");
        Ok(())
    }

    fn name(&self) -> &str {
        "tantivy"
    }
}
