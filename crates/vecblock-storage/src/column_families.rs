//! Column family definitions for RocksDB.
//!
//! Each database namespace holds:
//! - default: namespace metadata (schema version)
//! - config_block: one configuration record per collection
//! - collection:{name}: one table per collection, keyed by entry index

use rocksdb::{ColumnFamilyDescriptor, Options};
use vecblock_types::StorageSettings;

/// Column family name for the shared config table
pub const CF_CONFIG_BLOCK: &str = "config_block";

/// Prefix of every collection column family
pub const COLLECTION_CF_PREFIX: &str = "collection:";

/// Column family name for a collection table
pub fn collection_cf_name(collection: &str) -> String {
    format!("{}{}", COLLECTION_CF_PREFIX, collection)
}

/// Collection name from a column family name, if it is a collection table
pub fn collection_name(cf_name: &str) -> Option<&str> {
    cf_name.strip_prefix(COLLECTION_CF_PREFIX)
}

/// Options for collection tables (compressed when enabled)
pub fn collection_options(settings: &StorageSettings) -> Options {
    let mut opts = Options::default();
    if settings.compression {
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
    }
    opts
}

/// Options for a table by name
pub fn table_options(cf_name: &str, settings: &StorageSettings) -> Options {
    if collection_name(cf_name).is_some() {
        collection_options(settings)
    } else {
        Options::default()
    }
}

/// Build descriptors for the tables already present on disk
pub fn build_cf_descriptors(
    existing: &[String],
    settings: &StorageSettings,
) -> Vec<ColumnFamilyDescriptor> {
    existing
        .iter()
        .filter(|name| name.as_str() != rocksdb::DEFAULT_COLUMN_FAMILY_NAME)
        .map(|name| ColumnFamilyDescriptor::new(name, table_options(name, settings)))
        .collect()
}
