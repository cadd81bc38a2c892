//! Storage layer for vecblock.
//!
//! Provides RocksDB-backed storage with:
//! - One RocksDB instance ("namespace") per database
//! - One column family per table: the shared config table and one per collection
//! - Schema version bumped once per structural upgrade pass
//! - Atomic write batches with read-your-writes visibility
//! - Order-preserving integer keys for entry indexes

pub mod batch;
pub mod column_families;
pub mod db;
pub mod error;
pub mod keys;

pub use batch::TableBatch;
pub use column_families::{collection_cf_name, collection_name, CF_CONFIG_BLOCK};
pub use db::{Cursor, Namespace, NamespaceStats};
pub use error::StorageError;
pub use keys::{ConfigKey, IndexKey};
