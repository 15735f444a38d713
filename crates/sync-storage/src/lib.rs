//! Record store layer for content-sync.
//!
//! Defines the [`RecordStore`] contract the indexing core reads from and
//! ships two implementations:
//! - [`Storage`]: RocksDB with column families for records and metadata
//! - [`InMemoryRecordStore`]: a swappable fake for tests and demos

pub mod column_families;
pub mod db;
pub mod error;
pub mod keys;
pub mod memory;
pub mod store;

pub use db::Storage;
pub use error::StorageError;
pub use keys::{MetaOwnerKey, MetadataKey, RecordKey};
pub use memory::{InMemoryRecordStore, PageRequest};
pub use store::{RecordStore, RecordWriter};
