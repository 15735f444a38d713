//! # sync-types
//!
//! Shared domain types for content-sync.
//!
//! This crate defines the data structures passed between the record store,
//! the indexing core and the index backend:
//! - Records: store rows projected onto a canonical `ID`
//! - Documents: normalized, index-ready views of records
//! - Actions: pending `index_item` / `delete_item` intents
//! - Triggers: mutation notifications delivered by the host
//! - Settings: layered configuration
//!
//! ## Usage
//!
//! ```rust
//! use sync_types::{Action, RecordId};
//!
//! let action = Action::index("comment", RecordId::Int(5));
//! assert_eq!(action.id.to_string(), "5");
//! ```

pub mod action;
pub mod config;
pub mod document;
pub mod error;
pub mod record;

pub use action::{Action, ActionKind, TriggerKind, TriggerPayload};
pub use config::{IndexSettings, Settings, SyncMode, SyncSettings, TieBreak};
pub use document::{document_key, Document};
pub use error::SyncError;
pub use record::{
    MetadataValues, RawRecord, Record, RecordId, DOC_TYPE_FIELD, ID_FIELD, META_FIELD,
    RESERVED_FIELDS,
};
