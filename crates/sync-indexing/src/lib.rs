//! Sync core for content-sync.
//!
//! Keeps a search index consistent with a mutable record store, either
//! incrementally from mutation hooks or in bulk by paging the store.
//!
//! ## Key Components
//!
//! - [`TypeBinding`]: per-content-type contract (triggers, normalization, paging)
//! - [`CommentBinding`]: reference binding for comments
//! - [`TypeRegistry`]: registered bindings in registration order
//! - [`EventRouter`]: hook name to binding dispatch
//! - [`ActionQueue`] / [`SyncCycle`]: per-cycle deduplicating queue and flush
//! - [`BulkSyncDriver`]: paged full or pending reindex
//! - [`IndexBackend`]: where documents go ([`TantivyBackend`], [`InMemoryBackend`])
//!
//! ## Example
//!
//! ```ignore
//! use sync_indexing::{CommentBinding, Synchronizer, SyncOptions};
//!
//! let mut sync = Synchronizer::new(backend);
//! sync.register_type(Arc::new(CommentBinding::new(store)));
//!
//! let mut cycle = sync.begin_cycle();
//! cycle.trigger("edit_comment", TriggerPayload::record(12i64));
//! cycle.flush();
//!
//! let report = sync.sync_all(SyncOptions::default().with_per_page(50)).await;
//! ```

pub mod binding;
pub mod bulk;
pub mod comment;
pub mod cycle;
pub mod error;
pub mod memory_backend;
pub mod normalizer;
pub mod pagination;
pub mod queue;
pub mod registry;
pub mod router;
pub mod store_binding;
pub mod synchronizer;
pub mod tantivy_backend;
pub mod updater;

#[cfg(test)]
mod testing;

pub use binding::{metadata_owner, Hook, TypeBinding};
pub use bulk::{
    sync_type, BulkSyncDriver, LoggingProgressCallback, NoOpProgressCallback, PageProgress,
    ProgressCallback, SyncOptions, SyncReport, TypeReport, DEFAULT_PER_PAGE,
};
pub use comment::{parse_comment_date, CommentBinding, COMMENT_PRIMARY_KEY, COMMENT_TYPE};
pub use cycle::SyncCycle;
pub use error::{BackendError, IndexingError, NormalizationError};
pub use memory_backend::{BackendOp, InMemoryBackend};
pub use normalizer::{
    flatten_metadata, DocumentFilter, ExcludeFields, ItemRef, KeepAllFields, Normalizer,
};
pub use pagination::{fetch_page, fetch_page_ids, page_count, page_offset};
pub use queue::{ActionQueue, FlushReport};
pub use registry::TypeRegistry;
pub use router::EventRouter;
pub use store_binding::StoreBinding;
pub use synchronizer::Synchronizer;
pub use tantivy_backend::TantivyBackend;
pub use updater::{IndexBackend, UpdateResult};
