//! Error types for the sync core.

use sync_search::SearchError;
use sync_storage::StorageError;
use sync_types::RecordId;
use thiserror::Error;

/// A record could not be turned into a document.
///
/// Every variant is recoverable: incremental flushes drop the action and
/// bulk sync counts the item as skipped.
#[derive(Error, Debug)]
pub enum NormalizationError {
    /// No usable primary key could be resolved
    #[error("Missing id for {doc_type} record")]
    MissingId { doc_type: String },

    /// The id no longer resolves to a record
    #[error("{doc_type} record {id} not found")]
    NotFound { doc_type: String, id: RecordId },

    /// Metadata returned by the store could not be flattened
    #[error("Malformed metadata on {doc_type} record {id}: {reason}")]
    MalformedMetadata {
        doc_type: String,
        id: RecordId,
        reason: String,
    },

    /// The store failed while resolving a single item
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl NormalizationError {
    /// Whether the target simply no longer exists.
    pub fn is_not_found(&self) -> bool {
        matches!(self, NormalizationError::NotFound { .. })
    }
}

/// The index backend rejected a write, delete or commit.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Backend refused the operation
    #[error("Backend rejected {operation} of {key}: {reason}")]
    Rejected {
        operation: &'static str,
        key: String,
        reason: String,
    },

    /// Tantivy index error
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    /// Backend cannot be reached or is in a bad state
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by the sync core to its callers.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Count or page query failed
    #[error("Store query error: {0}")]
    StoreQuery(#[from] StorageError),

    /// Document normalization failed
    #[error("Normalization error: {0}")]
    Normalization(#[from] NormalizationError),

    /// Backend submission failed
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// No binding registered under this name
    #[error("Unknown content type: {0}")]
    UnknownType(String),

    /// Invalid sync options
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}
