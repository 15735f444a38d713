//! Search indexer for writing documents to the Tantivy index.
//!
//! One writer serves every content type. Documents are not visible until
//! commit() is called.

use std::sync::{Mutex, MutexGuard};

use tantivy::{IndexWriter, Term};
use tracing::{debug, info};

use sync_types::{document_key, Document, RecordId};

use crate::document::to_tantivy_doc;
use crate::error::SearchError;
use crate::index::SearchIndex;
use crate::schema::DocumentSchema;

/// Manages document indexing operations.
///
/// Documents are addressed by `{doc_type}:{id}`; indexing a document with an
/// existing address replaces it.
pub struct SearchIndexer {
    writer: Mutex<IndexWriter>,
    schema: DocumentSchema,
}

impl SearchIndexer {
    /// Create a new indexer from a SearchIndex.
    pub fn new(index: &SearchIndex) -> Result<Self, SearchError> {
        let writer = index.writer()?;
        let schema = index.schema().clone();

        Ok(Self {
            writer: Mutex::new(writer),
            schema,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, IndexWriter>, SearchError> {
        self.writer
            .lock()
            .map_err(|e| SearchError::IndexLocked(e.to_string()))
    }

    /// Index a document, replacing any previous version.
    pub fn index_document(&self, document: &Document) -> Result<(), SearchError> {
        let doc = to_tantivy_doc(&self.schema, document)?;
        let key = document.key();

        let writer = self.lock()?;
        writer.delete_term(Term::from_field_text(self.schema.doc_key, &key));
        writer.add_document(doc)?;

        debug!(key = %key, "Indexed document");
        Ok(())
    }

    /// Delete a document by type and id. Deleting an absent document is a no-op.
    pub fn delete_document(&self, doc_type: &str, id: &RecordId) -> Result<(), SearchError> {
        let key = document_key(doc_type, id);

        let writer = self.lock()?;
        writer.delete_term(Term::from_field_text(self.schema.doc_key, &key));

        debug!(key = %key, "Deleted document");
        Ok(())
    }

    /// Commit pending changes to make them searchable.
    pub fn commit(&self) -> Result<u64, SearchError> {
        let mut writer = self.lock()?;
        let opstamp = writer.commit()?;
        info!(opstamp, "Committed index changes");
        Ok(opstamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::searcher::DocumentSearcher;
    use serde_json::json;
    use std::collections::BTreeMap;
    use sync_types::Record;

    fn comment(id: i64, content: &str) -> Document {
        let record = Record {
            id: RecordId::Int(id),
            fields: json!({"comment_content": content}).as_object().cloned().unwrap(),
        };
        Document::new("comment", record, BTreeMap::new())
    }

    #[test]
    fn test_index_replaces_existing_document() {
        let index = SearchIndex::in_memory();
        let indexer = SearchIndexer::new(&index).unwrap();

        indexer.index_document(&comment(1, "first draft")).unwrap();
        indexer.commit().unwrap();
        indexer.index_document(&comment(1, "second draft")).unwrap();
        indexer.commit().unwrap();

        let searcher = DocumentSearcher::new(&index).unwrap();
        searcher.reload().unwrap();
        assert_eq!(searcher.count(), 1);

        let body = searcher.get("comment", &RecordId::Int(1)).unwrap().unwrap();
        assert_eq!(body["comment_content"], json!("second draft"));
    }

    #[test]
    fn test_delete_document() {
        let index = SearchIndex::in_memory();
        let indexer = SearchIndexer::new(&index).unwrap();

        indexer.index_document(&comment(1, "one")).unwrap();
        indexer.index_document(&comment(2, "two")).unwrap();
        indexer.commit().unwrap();

        indexer.delete_document("comment", &RecordId::Int(1)).unwrap();
        indexer.delete_document("comment", &RecordId::Int(404)).unwrap();
        indexer.commit().unwrap();

        let searcher = DocumentSearcher::new(&index).unwrap();
        searcher.reload().unwrap();
        assert_eq!(searcher.count(), 1);
        assert!(searcher.get("comment", &RecordId::Int(1)).unwrap().is_none());
        assert!(searcher.get("comment", &RecordId::Int(2)).unwrap().is_some());
    }
}
