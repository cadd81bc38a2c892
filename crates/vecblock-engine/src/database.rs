//! Databases: one storage namespace holding the collections of one name.
//!
//! Every [`Database`] handle opened for the same name shares one
//! [`DatabaseInner`]. Writes take the namespace lock exclusively, so an
//! existence check and the write that depends on it are atomic for every
//! caller in the process. Reads share the lock.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use serde::Serialize;
use tracing::{info, instrument, warn};

use vecblock_storage::{collection_cf_name, collection_name, ConfigKey, Namespace, CF_CONFIG_BLOCK};
use vecblock_types::{DeleteStatus, OpenStatus, VecBlockError};

use crate::collection::{Collection, CollectionConfig};
use crate::connection::validate_name;

/// State shared by every handle on one database.
pub(crate) struct DatabaseInner {
    name: String,
    path: PathBuf,
    /// `None` once the database has been deleted
    ns: RwLock<Option<Namespace>>,
    /// Open collection handles by collection name, across all handles
    open_collections: DashMap<String, usize>,
}

impl DatabaseInner {
    pub(crate) fn new(name: &str, path: &Path, ns: Namespace) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            ns: RwLock::new(Some(ns)),
            open_collections: DashMap::new(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    fn unavailable(&self) -> VecBlockError {
        VecBlockError::transaction(format!(
            "Database '{}' has been deleted or closed",
            self.name
        ))
    }

    fn poisoned(&self) -> VecBlockError {
        VecBlockError::transaction(format!(
            "Lock on database '{}' was poisoned by a panicking writer",
            self.name
        ))
    }

    /// Run `f` with shared access to the namespace.
    pub(crate) fn read<T>(
        &self,
        f: impl FnOnce(&Namespace) -> Result<T, VecBlockError>,
    ) -> Result<T, VecBlockError> {
        let guard = self.ns.read().map_err(|_| self.poisoned())?;
        let ns = guard.as_ref().ok_or_else(|| self.unavailable())?;
        f(ns)
    }

    /// Run `f` with exclusive access to the namespace.
    pub(crate) fn write<T>(
        &self,
        f: impl FnOnce(&mut Namespace) -> Result<T, VecBlockError>,
    ) -> Result<T, VecBlockError> {
        let mut guard = self.ns.write().map_err(|_| self.poisoned())?;
        let ns = guard.as_mut().ok_or_else(|| self.unavailable())?;
        f(ns)
    }

    /// Close the namespace so its files can be removed.
    ///
    /// Refused while any collection handle is open.
    pub(crate) fn close_for_delete(&self) -> Result<(), VecBlockError> {
        let mut guard = self.ns.write().map_err(|_| self.poisoned())?;
        let open = self.open_collection_count();
        if open > 0 {
            warn!(database = %self.name, open, "Refusing to delete database with open collections");
            return Err(VecBlockError::connection(format!(
                "Cannot delete database '{}': {} collection handle(s) still open",
                self.name, open
            )));
        }
        guard.take();
        Ok(())
    }

    pub(crate) fn collection_opened(&self, collection: &str) {
        *self
            .open_collections
            .entry(collection.to_string())
            .or_insert(0) += 1;
    }

    pub(crate) fn collection_closed(&self, collection: &str) {
        self.open_collections
            .remove_if_mut(collection, |_, count| {
                *count = count.saturating_sub(1);
                *count == 0
            });
    }

    pub(crate) fn is_collection_open(&self, collection: &str) -> bool {
        self.open_collections
            .get(collection)
            .is_some_and(|count| *count > 0)
    }

    pub(crate) fn open_collection_count(&self) -> usize {
        self.open_collections.iter().map(|item| *item.value()).sum()
    }
}

/// A handle on an open database.
///
/// At most one collection may be open through a handle at a time.
pub struct Database {
    inner: Arc<DatabaseInner>,
    open_status: OpenStatus,
    /// Set while a collection opened through this handle is alive
    busy: Arc<AtomicBool>,
}

/// Per-collection numbers reported by [`Database::stats`].
#[derive(Debug, Clone, Serialize)]
pub struct CollectionStats {
    pub name: String,
    pub entries: u64,
    pub config: Option<CollectionConfig>,
}

/// Summary of a database.
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStats {
    pub name: String,
    pub path: PathBuf,
    pub schema_version: u64,
    pub collections: Vec<CollectionStats>,
    pub disk_usage_bytes: u64,
}

impl Database {
    pub(crate) fn new(inner: Arc<DatabaseInner>, open_status: OpenStatus) -> Self {
        Self {
            inner,
            open_status,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Whether this open created the database.
    pub fn open_status(&self) -> OpenStatus {
        self.open_status
    }

    pub fn schema_version(&self) -> Result<u64, VecBlockError> {
        self.inner.read(|ns| {
            ns.schema_version().map_err(|e| {
                VecBlockError::open_db(format!(
                    "Failed to read schema version of database '{}': {}",
                    self.name(),
                    e
                ))
            })
        })
    }

    /// Whether a collection opened through this handle is still open.
    pub fn has_open_collection(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Open a collection by name.
    ///
    /// The collection is created on its first `configure`. Fails with an
    /// open-collection error while another collection opened through this
    /// handle is still open.
    #[instrument(skip(self), fields(database = %self.name()))]
    pub fn open_collection(&self, name: &str) -> Result<Collection, VecBlockError> {
        validate_name("collection", name)?;

        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(collection = %name, "Refusing to open a second collection on one handle");
            return Err(VecBlockError::open_collection(format!(
                "Cannot open collection '{}': another collection is already open on database '{}'. Close it first",
                name,
                self.name()
            )));
        }

        // Registered under the read lock so deletes observe it
        let registered = self.inner.read(|_| {
            self.inner.collection_opened(name);
            Ok(())
        });
        if let Err(e) = registered {
            self.busy.store(false, Ordering::Release);
            return Err(e);
        }

        info!(collection = %name, "Opened collection");
        Ok(Collection::new(
            Arc::clone(&self.inner),
            name,
            Arc::clone(&self.busy),
        ))
    }

    /// Names of every created collection, sorted.
    pub fn list_collections(&self) -> Result<Vec<String>, VecBlockError> {
        self.inner.read(|ns| {
            Ok(ns
                .tables()
                .filter_map(collection_name)
                .map(str::to_string)
                .collect())
        })
    }

    /// Drop a collection with all its entries and its configuration.
    ///
    /// Refused while any handle on the collection is open.
    #[instrument(skip(self), fields(database = %self.name()))]
    pub fn delete_collection(&self, name: &str) -> Result<DeleteStatus, VecBlockError> {
        validate_name("collection", name)?;

        self.inner.write(|ns| {
            if self.inner.is_collection_open(name) {
                warn!(collection = %name, "Refusing to delete an open collection");
                return Err(VecBlockError::open_collection(format!(
                    "Cannot delete collection '{}': it is still open",
                    name
                )));
            }

            let table = collection_cf_name(name);
            let config_key = ConfigKey::new(name).to_bytes();
            let has_config = ns.has_table(CF_CONFIG_BLOCK)
                && ns
                    .get(CF_CONFIG_BLOCK, &config_key)
                    .map_err(|e| {
                        VecBlockError::config(format!(
                            "Failed to read configuration of collection '{}': {}",
                            name, e
                        ))
                    })?
                    .is_some();
            let has_table = ns.has_table(&table);
            if !has_table && !has_config {
                return Err(VecBlockError::open_collection(format!(
                    "Cannot delete collection '{}': it does not exist in database '{}'",
                    name,
                    self.name()
                )));
            }

            // Configuration goes first: a config without a table blocks the name
            if has_config {
                ns.delete(CF_CONFIG_BLOCK, &config_key).map_err(|e| {
                    VecBlockError::config(format!(
                        "Failed to remove configuration of collection '{}': {}",
                        name, e
                    ))
                })?;
            }
            if !has_table {
                warn!(collection = %name, "Removed configuration left without a table");
                return Ok(DeleteStatus::Collection(name.to_string()));
            }

            let version = ns.drop_table(&table).map_err(|e| {
                VecBlockError::open_collection(format!(
                    "Failed to drop collection '{}': {}",
                    name, e
                ))
            })?;

            info!(collection = %name, version, "Deleted collection");
            Ok(DeleteStatus::Collection(name.to_string()))
        })
    }

    /// Flush memtables and compact every table.
    #[instrument(skip(self), fields(database = %self.name()))]
    pub fn compact(&self) -> Result<(), VecBlockError> {
        self.inner.write(|ns| {
            ns.flush()
                .and_then(|_| ns.compact())
                .map_err(|e| {
                    VecBlockError::operations(format!(
                        "Failed to compact database '{}': {}",
                        self.name(),
                        e
                    ))
                })
        })
    }

    /// Collect per-collection counts and disk usage.
    pub fn stats(&self) -> Result<DatabaseStats, VecBlockError> {
        self.inner.read(|ns| {
            let raw = ns.stats().map_err(|e| {
                VecBlockError::operations(format!(
                    "Failed to collect stats of database '{}': {}",
                    self.name(),
                    e
                ))
            })?;

            let mut collections = Vec::new();
            for (table, entries) in raw.tables {
                let Some(name) = collection_name(&table) else {
                    continue;
                };
                collections.push(CollectionStats {
                    name: name.to_string(),
                    entries,
                    config: CollectionConfig::read(ns, name)?,
                });
            }

            Ok(DatabaseStats {
                name: self.name().to_string(),
                path: self.inner.path.clone(),
                schema_version: raw.schema_version,
                collections,
                disk_usage_bytes: raw.disk_usage_bytes,
            })
        })
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name())
            .field("open_status", &self.open_status)
            .field("busy", &self.has_open_collection())
            .finish()
    }
}
