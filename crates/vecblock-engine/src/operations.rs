//! CRUD and search over one configured collection.
//!
//! Every write runs inside a [`TableBatch`] under the database's exclusive
//! lock, so the existence check of an insert and its write are one atomic
//! step. Batched forms share one batch: items observe earlier items of the
//! same call, report their own result, and commit together.

use std::sync::Arc;

use tracing::{debug, instrument};

use vecblock_storage::{collection_cf_name, IndexKey, Namespace, StorageError, TableBatch};
use vecblock_types::{ElementType, Entry, OpStatus, SearchHit, VecBlockError};

use crate::codec;
use crate::collection::CollectionConfig;
use crate::database::DatabaseInner;
use crate::distance::distance;
use crate::record::StoredRecord;
use crate::search::{SearchQuery, TopK};

/// Data operations bound to one configured collection.
pub struct Operations {
    db: Arc<DatabaseInner>,
    collection: String,
    table: String,
    config: CollectionConfig,
}

impl Operations {
    pub(crate) fn new(db: Arc<DatabaseInner>, collection: &str, config: CollectionConfig) -> Self {
        Self {
            db,
            collection: collection.to_string(),
            table: collection_cf_name(collection),
            config,
        }
    }

    pub fn config(&self) -> CollectionConfig {
        self.config
    }

    pub fn element_type(&self) -> ElementType {
        self.config.element_type
    }

    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    /// Check a vector against the collection's dimension and element type.
    pub fn verify_vector(&self, vector: &[f64]) -> Result<(), VecBlockError> {
        if vector.len() != self.config.dimension {
            return Err(VecBlockError::operations(format!(
                "Vector has {} elements, collection '{}' has dimension {}",
                vector.len(),
                self.collection,
                self.config.dimension
            )));
        }
        codec::check_elements(vector, self.config.element_type)
    }

    fn backend_error(&self, action: &str, e: StorageError) -> VecBlockError {
        VecBlockError::operations(format!(
            "{} on collection '{}' failed: {}",
            action, self.collection, e
        ))
    }

    /// Run `f` in one batch under the write lock and commit it.
    fn write_batch<T>(
        &self,
        action: &str,
        f: impl FnOnce(&mut TableBatch<'_>) -> Result<T, VecBlockError>,
    ) -> Result<T, VecBlockError> {
        self.db.write(|ns| {
            let mut batch = ns.batch(&self.table).map_err(|e| {
                VecBlockError::transaction(format!(
                    "Could not start {} on collection '{}': {}",
                    action, self.collection, e
                ))
            })?;
            let result = f(&mut batch)?;
            batch
                .commit()
                .map_err(|e| self.backend_error(&format!("Commit of {}", action), e))?;
            Ok(result)
        })
    }

    fn read_record(
        &self,
        get: impl FnOnce(&[u8]) -> Result<Option<Vec<u8>>, StorageError>,
        index: i64,
    ) -> Result<Option<Entry>, VecBlockError> {
        let key = IndexKey::new(index).to_bytes();
        let bytes = get(&key[..])
            .map_err(|e| self.backend_error(&format!("Read at index {}", index), e))?;
        bytes
            .map(|bytes| {
                StoredRecord::from_bytes(&bytes)?
                    .into_entry(self.config.element_type, self.config.dimension)
            })
            .transpose()
    }

    fn insert_in(&self, batch: &mut TableBatch<'_>, entry: &Entry) -> Result<OpStatus, VecBlockError> {
        let key = IndexKey::new(entry.index).to_bytes();
        let exists = batch
            .contains(&key)
            .map_err(|e| self.backend_error(&format!("Insert at index {}", entry.index), e))?;
        if exists {
            return Ok(OpStatus::AlreadyPresent(entry.index));
        }

        self.verify_vector(&entry.vector)?;
        let bytes = StoredRecord::from_entry(entry, self.config.element_type)?.to_bytes()?;
        batch
            .put(&key, bytes)
            .map_err(|e| self.backend_error(&format!("Insert at index {}", entry.index), e))?;
        Ok(OpStatus::Inserted(entry.index))
    }

    fn update_in(&self, batch: &mut TableBatch<'_>, entry: &Entry) -> Result<OpStatus, VecBlockError> {
        let stored = self
            .read_record(|key| batch.get(key), entry.index)?
            .ok_or_else(|| {
                VecBlockError::input(format!(
                    "Cannot update index {}: no entry exists at that index",
                    entry.index
                ))
            })?;
        if stored == *entry {
            return Ok(OpStatus::Unchanged(entry.index));
        }

        self.verify_vector(&entry.vector)?;
        let key = IndexKey::new(entry.index).to_bytes();
        let bytes = StoredRecord::from_entry(entry, self.config.element_type)?.to_bytes()?;
        batch
            .put(&key, bytes)
            .map_err(|e| self.backend_error(&format!("Update at index {}", entry.index), e))?;
        Ok(OpStatus::Updated(entry.index))
    }

    fn delete_in(&self, batch: &mut TableBatch<'_>, index: i64) -> Result<OpStatus, VecBlockError> {
        let key = IndexKey::new(index).to_bytes();
        let exists = batch
            .contains(&key)
            .map_err(|e| self.backend_error(&format!("Delete at index {}", index), e))?;
        if !exists {
            return Err(VecBlockError::input(format!(
                "Cannot delete index {}: no entry exists at that index",
                index
            )));
        }
        batch
            .delete(&key)
            .map_err(|e| self.backend_error(&format!("Delete at index {}", index), e))?;
        Ok(OpStatus::Deleted(index))
    }

    /// Insert an entry. An index that is already present is left untouched.
    #[instrument(skip(self, entry), fields(collection = %self.collection, index = entry.index))]
    pub fn insert(&self, entry: &Entry) -> Result<OpStatus, VecBlockError> {
        let status = self.write_batch("insert", |batch| self.insert_in(batch, entry))?;
        debug!(%status, "Insert finished");
        Ok(status)
    }

    /// Insert several entries in one batch, one result per entry.
    #[instrument(skip(self, entries), fields(collection = %self.collection, count = entries.len()))]
    pub fn insert_many(
        &self,
        entries: &[Entry],
    ) -> Result<Vec<Result<OpStatus, VecBlockError>>, VecBlockError> {
        let results = self.write_batch("insert_many", |batch| {
            Ok(entries
                .iter()
                .map(|entry| self.insert_in(batch, entry))
                .collect::<Vec<_>>())
        })?;
        debug!(
            inserted = results.iter().filter(|r| matches!(r, Ok(OpStatus::Inserted(_)))).count(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "Batch insert finished"
        );
        Ok(results)
    }

    /// Fetch one entry. A missing index is an error.
    #[instrument(skip(self), fields(collection = %self.collection))]
    pub fn get_by_index(&self, index: i64) -> Result<Entry, VecBlockError> {
        self.db.read(|ns| self.get_in(ns, index))
    }

    fn get_in(&self, ns: &Namespace, index: i64) -> Result<Entry, VecBlockError> {
        self.read_record(|key| ns.get(&self.table, key), index)?
            .ok_or_else(|| {
                VecBlockError::operations(format!(
                    "No entry found at index {} in collection '{}'",
                    index, self.collection
                ))
            })
    }

    /// Fetch several entries from one consistent view, one result per index.
    #[instrument(skip(self, indices), fields(collection = %self.collection, count = indices.len()))]
    pub fn get_by_indices(
        &self,
        indices: &[i64],
    ) -> Result<Vec<Result<Entry, VecBlockError>>, VecBlockError> {
        self.db.read(|ns| {
            Ok(indices
                .iter()
                .map(|&index| self.get_in(ns, index))
                .collect())
        })
    }

    /// Replace an existing entry wholesale.
    ///
    /// An entry equal to the stored one is reported as unchanged and not
    /// written.
    #[instrument(skip(self, entry), fields(collection = %self.collection, index = entry.index))]
    pub fn update(&self, entry: &Entry) -> Result<OpStatus, VecBlockError> {
        let status = self.write_batch("update", |batch| self.update_in(batch, entry))?;
        debug!(%status, "Update finished");
        Ok(status)
    }

    /// Update several entries in one batch, one result per entry.
    #[instrument(skip(self, entries), fields(collection = %self.collection, count = entries.len()))]
    pub fn update_many(
        &self,
        entries: &[Entry],
    ) -> Result<Vec<Result<OpStatus, VecBlockError>>, VecBlockError> {
        self.write_batch("update_many", |batch| {
            Ok(entries
                .iter()
                .map(|entry| self.update_in(batch, entry))
                .collect())
        })
    }

    /// Delete one entry. The index must exist.
    #[instrument(skip(self), fields(collection = %self.collection))]
    pub fn delete_by_index(&self, index: i64) -> Result<OpStatus, VecBlockError> {
        let status = self.write_batch("delete", |batch| self.delete_in(batch, index))?;
        debug!(%status, "Delete finished");
        Ok(status)
    }

    /// Delete several entries in one batch, one result per index.
    #[instrument(skip(self, indices), fields(collection = %self.collection, count = indices.len()))]
    pub fn delete_by_indices(
        &self,
        indices: &[i64],
    ) -> Result<Vec<Result<OpStatus, VecBlockError>>, VecBlockError> {
        self.write_batch("delete_many", |batch| {
            Ok(indices
                .iter()
                .map(|&index| self.delete_in(batch, index))
                .collect())
        })
    }

    /// Remove every entry of the collection.
    #[instrument(skip(self), fields(collection = %self.collection))]
    pub fn delete_all(&self) -> Result<OpStatus, VecBlockError> {
        let status = self.write_batch("delete_all", |batch| {
            batch
                .clear()
                .map_err(|e| self.backend_error("Delete all", e))?;
            Ok(OpStatus::Cleared)
        })?;
        debug!("Cleared collection");
        Ok(status)
    }

    /// Number of stored entries.
    pub fn count(&self) -> Result<u64, VecBlockError> {
        self.db.read(|ns| {
            ns.count(&self.table)
                .map_err(|e| self.backend_error("Count", e))
        })
    }

    /// Exhaustive top-K search.
    ///
    /// Returns exactly `top_k` hits ordered by ascending distance; slots no
    /// entry filled stay sentinels. A filter that cannot be evaluated on some
    /// record's metadata fails the whole search with an input error.
    #[instrument(
        skip(self, query),
        fields(collection = %self.collection, metric = %query.metric, top_k = query.top_k)
    )]
    pub fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, VecBlockError> {
        self.verify_vector(&query.vector)?;

        let mut top = TopK::new(query.top_k);
        let mut scanned = 0u64;
        self.db.read(|ns| {
            let cursor = ns
                .scan(&self.table)
                .map_err(|e| self.backend_error("Search", e))?;
            for item in cursor {
                let (_, value) = item.map_err(|e| self.backend_error("Search", e))?;
                scanned += 1;

                let record = StoredRecord::from_bytes(&value)?;
                if !query.filter.matches(&record.metadata)? {
                    continue;
                }
                let entry = record.into_entry(self.config.element_type, self.config.dimension)?;
                let d = distance(query.metric, &query.vector, &entry.vector);
                top.offer(entry, d);
            }
            Ok(())
        })?;

        debug!(scanned, matched = top.seen(), "Search finished");
        Ok(top.into_sorted())
    }
}

impl std::fmt::Debug for Operations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operations")
            .field("collection", &self.collection)
            .field("config", &self.config)
            .finish()
    }
}
