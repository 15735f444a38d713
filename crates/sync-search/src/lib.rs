//! # sync-search
//!
//! Tantivy-backed document index for content-sync.
//!
//! Normalized documents from every content type share one schema and are
//! addressed by `{doc_type}:{id}`. The full document JSON is stored so the
//! index can be inspected after a sync.

pub mod document;
pub mod error;
pub mod index;
pub mod indexer;
pub mod schema;
pub mod searcher;

pub use document::{extract_text, to_tantivy_doc};
pub use error::SearchError;
pub use index::SearchIndex;
pub use indexer::SearchIndexer;
pub use schema::{build_document_schema, DocumentSchema};
pub use searcher::{DocumentSearcher, SearchHit, SearchOptions};
