//! Column family definitions for RocksDB.
//!
//! - records: content rows keyed by type and sortable id
//! - metadata: metadata rows keyed by type, owner and metadata id
//! - meta_owners: metadata id to owning record id

use rocksdb::{ColumnFamilyDescriptor, Options};

/// Column family name for content records
pub const CF_RECORDS: &str = "records";

/// Column family name for metadata rows
pub const CF_METADATA: &str = "metadata";

/// Column family name for the metadata-to-owner lookup
pub const CF_META_OWNERS: &str = "meta_owners";

/// All column family names
pub const ALL_CF_NAMES: &[&str] = &[CF_RECORDS, CF_METADATA, CF_META_OWNERS];

/// Records are read far more than written; compress them.
fn records_options() -> Options {
    let mut opts = Options::default();
    opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
    opts
}

/// Build all column family descriptors
pub fn build_cf_descriptors() -> Vec<ColumnFamilyDescriptor> {
    vec![
        ColumnFamilyDescriptor::new(CF_RECORDS, records_options()),
        ColumnFamilyDescriptor::new(CF_METADATA, Options::default()),
        ColumnFamilyDescriptor::new(CF_META_OWNERS, Options::default()),
    ]
}
