//! RocksDB wrapper for one database namespace.
//!
//! Provides:
//! - Namespace open/destroy with column family discovery
//! - Table (column family) creation and removal with schema versioning
//! - Single-key reads and writes, forward cursors, table counts
//! - Write batches via [`TableBatch`]

use rocksdb::{ColumnFamily, IteratorMode, Options, DB};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

use crate::batch::TableBatch;
use crate::column_families::{build_cf_descriptors, table_options};
use crate::error::StorageError;
use crate::keys::SCHEMA_VERSION_KEY;
use vecblock_types::StorageSettings;

/// One RocksDB instance holding the tables of a single database.
pub struct Namespace {
    pub(crate) db: DB,
    settings: StorageSettings,
    tables: BTreeSet<String>,
}

impl Namespace {
    /// Whether a namespace has been created at `path`
    pub fn exists(path: &Path) -> bool {
        path.join("CURRENT").is_file()
    }

    /// Open the namespace at the given path, creating it if necessary.
    ///
    /// A new namespace starts at schema version 1.
    pub fn open(path: &Path, settings: &StorageSettings) -> Result<Self, StorageError> {
        info!("Opening namespace at {:?}", path);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_background_jobs(settings.max_background_jobs);

        let existing = if Self::exists(path) {
            DB::list_cf(&Options::default(), path)?
        } else {
            Vec::new()
        };

        let cf_descriptors = build_cf_descriptors(&existing, settings);
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        let tables = existing
            .into_iter()
            .filter(|name| name != rocksdb::DEFAULT_COLUMN_FAMILY_NAME)
            .collect();

        let namespace = Self {
            db,
            settings: settings.clone(),
            tables,
        };

        if namespace.db.get(SCHEMA_VERSION_KEY)?.is_none() {
            namespace.write_schema_version(1)?;
        }

        Ok(namespace)
    }

    /// Remove every file of the namespace at `path`.
    ///
    /// The namespace must not be open.
    pub fn destroy(path: &Path) -> Result<(), StorageError> {
        DB::destroy(&Options::default(), path)?;
        if path.exists() {
            std::fs::remove_dir_all(path)?;
        }
        info!("Destroyed namespace at {:?}", path);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        self.db.path()
    }

    /// Current schema version
    pub fn schema_version(&self) -> Result<u64, StorageError> {
        match self.db.get(SCHEMA_VERSION_KEY)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    StorageError::Serialization(format!(
                        "Invalid schema version length: {}",
                        bytes.len()
                    ))
                })?;
                Ok(u64::from_be_bytes(raw))
            }
            None => Ok(0),
        }
    }

    fn write_schema_version(&self, version: u64) -> Result<(), StorageError> {
        self.db.put(SCHEMA_VERSION_KEY, version.to_be_bytes())?;
        Ok(())
    }

    fn bump_schema_version(&self) -> Result<u64, StorageError> {
        let version = self.schema_version()? + 1;
        self.write_schema_version(version)?;
        Ok(version)
    }

    fn validate_table_name(name: &str) -> Result<(), StorageError> {
        if name.is_empty() || name == rocksdb::DEFAULT_COLUMN_FAMILY_NAME {
            return Err(StorageError::InvalidTableName(name.to_string()));
        }
        Ok(())
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains(name)
    }

    /// Names of every table in the namespace, sorted
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(String::as_str)
    }

    /// Create the missing tables among `names` in one upgrade pass.
    ///
    /// Bumps the schema version by 1 if anything was created.
    /// Returns the schema version after the pass.
    pub fn create_tables(&mut self, names: &[&str]) -> Result<u64, StorageError> {
        for name in names {
            Self::validate_table_name(name)?;
        }

        let missing: Vec<&str> = names
            .iter()
            .copied()
            .filter(|name| !self.tables.contains(*name))
            .collect();
        if missing.is_empty() {
            return self.schema_version();
        }

        for name in &missing {
            let opts = table_options(name, &self.settings);
            self.db.create_cf(name, &opts)?;
            self.tables.insert(name.to_string());
        }

        let version = self.bump_schema_version()?;
        info!(tables = ?missing, version, "Created tables");
        Ok(version)
    }

    /// Drop a table in its own upgrade pass.
    ///
    /// Returns the schema version after the pass.
    pub fn drop_table(&mut self, name: &str) -> Result<u64, StorageError> {
        Self::validate_table_name(name)?;
        if !self.tables.contains(name) {
            return Err(StorageError::TableNotFound(name.to_string()));
        }

        self.db.drop_cf(name)?;
        self.tables.remove(name);

        let version = self.bump_schema_version()?;
        info!(table = %name, version, "Dropped table");
        Ok(version)
    }

    pub(crate) fn cf(&self, table: &str) -> Result<&ColumnFamily, StorageError> {
        self.db
            .cf_handle(table)
            .ok_or_else(|| StorageError::TableNotFound(table.to_string()))
    }

    /// Get a value from a table.
    pub fn get(&self, table: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let cf = self.cf(table)?;
        let result = self.db.get_cf(cf, key)?;
        Ok(result)
    }

    /// Put a value into a table.
    pub fn put(&self, table: &str, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let cf = self.cf(table)?;
        self.db.put_cf(cf, key, value)?;
        Ok(())
    }

    /// Delete a value from a table.
    pub fn delete(&self, table: &str, key: &[u8]) -> Result<(), StorageError> {
        let cf = self.cf(table)?;
        self.db.delete_cf(cf, key)?;
        Ok(())
    }

    /// Forward cursor over every record of a table.
    ///
    /// Callers must not rely on the order records are produced in.
    pub fn scan(&self, table: &str) -> Result<Cursor<'_>, StorageError> {
        let cf = self.cf(table)?;
        Ok(Cursor {
            inner: self.db.iterator_cf(cf, IteratorMode::Start),
        })
    }

    /// Number of records in a table.
    pub fn count(&self, table: &str) -> Result<u64, StorageError> {
        let mut count = 0u64;
        for item in self.scan(table)? {
            item?;
            count += 1;
        }
        Ok(count)
    }

    /// Start a write batch bound to one table.
    pub fn batch(&self, table: &str) -> Result<TableBatch<'_>, StorageError> {
        self.cf(table)?;
        Ok(TableBatch::new(self, table))
    }

    /// Flush all tables to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        for name in &self.tables {
            if let Some(cf) = self.db.cf_handle(name) {
                self.db.flush_cf(cf)?;
            }
        }
        Ok(())
    }

    /// Trigger manual compaction on all tables.
    pub fn compact(&self) -> Result<(), StorageError> {
        info!("Starting full compaction...");
        self.db.compact_range::<&[u8], &[u8]>(None, None);
        for name in &self.tables {
            if let Some(cf) = self.db.cf_handle(name) {
                self.db.compact_range_cf::<&[u8], &[u8]>(cf, None, None);
            }
        }
        info!("Compaction complete");
        Ok(())
    }

    /// Get namespace statistics.
    pub fn stats(&self) -> Result<NamespaceStats, StorageError> {
        let mut tables = Vec::with_capacity(self.tables.len());
        for name in &self.tables {
            tables.push((name.clone(), self.count(name)?));
        }

        let stats = NamespaceStats {
            schema_version: self.schema_version()?,
            tables,
            disk_usage_bytes: self.disk_usage(),
        };
        debug!(?stats, "Collected namespace stats");
        Ok(stats)
    }

    fn disk_usage(&self) -> u64 {
        let mut total_size = 0u64;
        if let Ok(entries) = std::fs::read_dir(self.db.path()) {
            for entry in entries.flatten() {
                if let Ok(metadata) = entry.metadata() {
                    total_size += metadata.len();
                }
            }
        }
        total_size
    }
}

/// Forward cursor over the raw records of one table.
pub struct Cursor<'a> {
    inner: rocksdb::DBIterator<'a>,
}

impl Iterator for Cursor<'_> {
    type Item = Result<(Box<[u8]>, Box<[u8]>), StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|item| item.map_err(StorageError::from))
    }
}

/// Statistics about a namespace.
#[derive(Debug, Default, Clone)]
pub struct NamespaceStats {
    pub schema_version: u64,
    /// (table name, record count), sorted by name
    pub tables: Vec<(String, u64)>,
    /// Total disk usage in bytes
    pub disk_usage_bytes: u64,
}
