//! Read access to indexed documents.
//!
//! Supports lookup by address and BM25 keyword search over the text field.

use serde_json::Value;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, QueryParser, TermQuery};
use tantivy::schema::{IndexRecordOption, Value as _};
use tantivy::{IndexReader, TantivyDocument, Term};
use tracing::{debug, info};

use sync_types::{document_key, RecordId};

use crate::error::SearchError;
use crate::index::SearchIndex;
use crate::schema::DocumentSchema;

/// A search result with relevance score.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Content type name
    pub doc_type: String,
    /// Record id as stored
    pub doc_id: String,
    /// BM25 relevance score
    pub score: f32,
}

/// Search options for filtering and limiting results.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Filter by content type (None = all types)
    pub doc_type: Option<String>,
    /// Maximum results to return
    pub limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            doc_type: None,
            limit: 10,
        }
    }
}

impl SearchOptions {
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = Some(doc_type.into());
        self
    }
}

/// Searcher over synchronized documents.
pub struct DocumentSearcher {
    reader: IndexReader,
    schema: DocumentSchema,
    query_parser: QueryParser,
}

impl DocumentSearcher {
    /// Create a new searcher from a SearchIndex.
    pub fn new(index: &SearchIndex) -> Result<Self, SearchError> {
        let reader = index.reader()?;
        let schema = index.schema().clone();
        let query_parser = QueryParser::for_index(index.index(), vec![schema.text]);

        Ok(Self {
            reader,
            schema,
            query_parser,
        })
    }

    /// Reload the reader to see recent commits.
    pub fn reload(&self) -> Result<(), SearchError> {
        self.reader.reload()?;
        debug!("Reloaded search reader");
        Ok(())
    }

    /// Number of live documents in the index.
    pub fn count(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Fetch the stored JSON body of one document.
    pub fn get(&self, doc_type: &str, id: &RecordId) -> Result<Option<Value>, SearchError> {
        let searcher = self.reader.searcher();
        let term = Term::from_field_text(self.schema.doc_key, &document_key(doc_type, id));
        let query = TermQuery::new(term, IndexRecordOption::Basic);

        let top_docs = searcher.search(&query, &TopDocs::with_limit(1))?;
        let Some((_, address)) = top_docs.into_iter().next() else {
            return Ok(None);
        };

        let doc: TantivyDocument = searcher.doc(address)?;
        let body = doc
            .get_first(self.schema.body)
            .and_then(|v| v.as_str())
            .ok_or_else(|| SearchError::SchemaMismatch("document without body".to_string()))?;

        Ok(Some(serde_json::from_str(body)?))
    }

    /// Search with a query string.
    ///
    /// Uses BM25 scoring over the text field.
    pub fn search(
        &self,
        query_str: &str,
        options: SearchOptions,
    ) -> Result<Vec<SearchHit>, SearchError> {
        if query_str.trim().is_empty() {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();
        let text_query = self.query_parser.parse_query(query_str)?;

        let final_query = if let Some(doc_type) = &options.doc_type {
            let type_term = Term::from_field_text(self.schema.doc_type, doc_type);
            let type_query = TermQuery::new(type_term, IndexRecordOption::Basic);

            Box::new(BooleanQuery::new(vec![
                (Occur::Must, text_query),
                (Occur::Must, Box::new(type_query)),
            ]))
        } else {
            text_query
        };

        let top_docs = searcher.search(&final_query, &TopDocs::with_limit(options.limit))?;

        let mut results = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher.doc(doc_address)?;
            let text_of = |field: tantivy::schema::Field| {
                doc.get_first(field)
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string()
            };

            results.push(SearchHit {
                doc_type: text_of(self.schema.doc_type),
                doc_id: text_of(self.schema.doc_id),
                score,
            });
        }

        info!(query = query_str, results = results.len(), "Search completed");
        Ok(results)
    }
}
