//! Write batches with read-your-writes visibility.
//!
//! A [`TableBatch`] is the transaction scope of one table: operations queued
//! on it observe each other through an in-memory overlay, and the whole batch
//! commits atomically through a single RocksDB `WriteBatch`.

use std::collections::BTreeMap;

use rocksdb::WriteBatch;
use tracing::debug;

use crate::db::Namespace;
use crate::error::StorageError;
use crate::keys::IndexKey;

pub struct TableBatch<'a> {
    ns: &'a Namespace,
    table: String,
    batch: WriteBatch,
    /// Pending writes by key; `None` marks a pending delete
    pending: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    /// Set once `clear` is queued; hides every committed record
    cleared: bool,
    ops: usize,
}

impl<'a> TableBatch<'a> {
    pub(crate) fn new(ns: &'a Namespace, table: &str) -> Self {
        Self {
            ns,
            table: table.to_string(),
            batch: WriteBatch::default(),
            pending: BTreeMap::new(),
            cleared: false,
            ops: 0,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Number of queued operations
    pub fn len(&self) -> usize {
        self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops == 0
    }

    /// Read a key, seeing operations already queued on this batch.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        if let Some(pending) = self.pending.get(key) {
            return Ok(pending.clone());
        }
        if self.cleared {
            return Ok(None);
        }
        self.ns.get(&self.table, key)
    }

    pub fn contains(&self, key: &[u8]) -> Result<bool, StorageError> {
        Ok(self.get(key)?.is_some())
    }

    pub fn put(&mut self, key: &[u8], value: Vec<u8>) -> Result<(), StorageError> {
        let ns = self.ns;
        let cf = ns.cf(&self.table)?;
        self.batch.put_cf(cf, key, &value);
        self.pending.insert(key.to_vec(), Some(value));
        self.ops += 1;
        Ok(())
    }

    pub fn delete(&mut self, key: &[u8]) -> Result<(), StorageError> {
        let ns = self.ns;
        let cf = ns.cf(&self.table)?;
        self.batch.delete_cf(cf, key);
        self.pending.insert(key.to_vec(), None);
        self.ops += 1;
        Ok(())
    }

    /// Queue removal of every index key in the table.
    pub fn clear(&mut self) -> Result<(), StorageError> {
        let ns = self.ns;
        let cf = ns.cf(&self.table)?;
        self.batch
            .delete_range_cf(cf, IndexKey::range_start(), IndexKey::range_end());
        self.pending.clear();
        self.cleared = true;
        self.ops += 1;
        Ok(())
    }

    /// Commit every queued operation atomically.
    ///
    /// Returns the number of operations written.
    pub fn commit(self) -> Result<usize, StorageError> {
        if self.ops == 0 {
            return Ok(0);
        }
        self.ns.db.write(self.batch)?;
        debug!(table = %self.table, ops = self.ops, "Committed batch");
        Ok(self.ops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column_families::collection_cf_name;
    use tempfile::TempDir;
    use vecblock_types::StorageSettings;

    fn setup() -> (Namespace, String, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut ns =
            Namespace::open(&temp_dir.path().join("db"), &StorageSettings::default()).unwrap();
        let table = collection_cf_name("docs");
        ns.create_tables(&[&table]).unwrap();
        (ns, table, temp_dir)
    }

    fn key(i: i64) -> [u8; 8] {
        IndexKey::new(i).to_bytes()
    }

    #[test]
    fn test_reads_see_pending_writes() {
        let (ns, table, _temp) = setup();
        let mut batch = ns.batch(&table).unwrap();

        assert!(!batch.contains(&key(1)).unwrap());
        batch.put(&key(1), b"a".to_vec()).unwrap();
        assert_eq!(batch.get(&key(1)).unwrap(), Some(b"a".to_vec()));

        // Not visible outside the batch until commit
        assert_eq!(ns.get(&table, &key(1)).unwrap(), None);

        assert_eq!(batch.commit().unwrap(), 1);
        assert_eq!(ns.get(&table, &key(1)).unwrap(), Some(b"a".to_vec()));
    }

    #[test]
    fn test_pending_delete_hides_committed_value() {
        let (ns, table, _temp) = setup();
        ns.put(&table, &key(2), b"b").unwrap();

        let mut batch = ns.batch(&table).unwrap();
        batch.delete(&key(2)).unwrap();
        assert!(!batch.contains(&key(2)).unwrap());
        batch.commit().unwrap();
        assert_eq!(ns.get(&table, &key(2)).unwrap(), None);
    }

    #[test]
    fn test_clear_then_put() {
        let (ns, table, _temp) = setup();
        for i in [-3, 0, 7] {
            ns.put(&table, &key(i), b"old").unwrap();
        }

        let mut batch = ns.batch(&table).unwrap();
        batch.clear().unwrap();
        assert!(!batch.contains(&key(7)).unwrap());
        batch.put(&key(7), b"new".to_vec()).unwrap();
        batch.commit().unwrap();

        assert_eq!(ns.count(&table).unwrap(), 1);
        assert_eq!(ns.get(&table, &key(7)).unwrap(), Some(b"new".to_vec()));
    }

    #[test]
    fn test_clear_covers_extreme_keys() {
        let (ns, table, _temp) = setup();
        ns.put(&table, &key(i64::MIN), b"min").unwrap();
        ns.put(&table, &key(i64::MAX), b"max").unwrap();

        let mut batch = ns.batch(&table).unwrap();
        batch.clear().unwrap();
        batch.commit().unwrap();
        assert_eq!(ns.count(&table).unwrap(), 0);
    }

    #[test]
    fn test_empty_commit_is_noop() {
        let (ns, table, _temp) = setup();
        let batch = ns.batch(&table).unwrap();
        assert!(batch.is_empty());
        assert_eq!(batch.commit().unwrap(), 0);
    }
}
