//! End-to-end test infrastructure for vecblock.
//!
//! Provides a shared TestHarness and helpers for tests covering the whole
//! path from connection to search.

use rand::Rng;
use serde_json::Value;

use vecblock_engine::{Collection, Connection, Database};
use vecblock_types::{ElementType, Entry, Metadata};

/// Shared test harness for E2E tests.
///
/// Owns a temporary data directory and a connection on it.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    pub conn: Connection,
}

impl TestHarness {
    /// Create a new test harness with temp directory and connection.
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let conn = Connection::open(temp_dir.path()).expect("Failed to open connection");
        Self {
            _temp_dir: temp_dir,
            conn,
        }
    }

    /// A fresh connection on the same data directory.
    pub fn reconnect(&self) -> Connection {
        Connection::open(self._temp_dir.path()).expect("Failed to reopen connection")
    }

    pub fn database(&self, name: &str) -> Database {
        self.conn
            .open_database(name)
            .expect("Failed to open database")
    }

    /// Open and configure a collection in a fresh database handle.
    pub fn collection(
        &self,
        db: &str,
        name: &str,
        element_type: ElementType,
        dimension: usize,
    ) -> (Database, Collection) {
        let db = self.database(db);
        let mut collection = db
            .open_collection(name)
            .expect("Failed to open collection");
        collection
            .configure(element_type, dimension)
            .expect("Failed to configure collection");
        (db, collection)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a metadata map from a JSON object literal.
pub fn metadata(value: Value) -> Metadata {
    match value {
        Value::Object(map) => map,
        other => panic!("metadata must be a JSON object, got {}", other),
    }
}

/// Entries with random vectors in `[-1, 1)`, indexed from `start`.
///
/// Components are generated as f32 so they survive float32 storage exactly.
pub fn random_entries(start: i64, count: usize, dimension: usize) -> Vec<Entry> {
    let mut rng = rand::rng();
    (0..count)
        .map(|i| {
            let index = start + i as i64;
            let vector = (0..dimension)
                .map(|_| rng.random_range(-1.0f32..1.0) as f64)
                .collect();
            Entry::new(index, format!("entry {}", index), vector)
        })
        .collect()
}
