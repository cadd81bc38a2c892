//! Entry point: opens, lists and deletes databases under one data directory.
//!
//! Each database lives in its own RocksDB directory `<data_dir>/<name>`.
//! RocksDB allows a directory to be opened once per process, so the
//! connection keeps a registry of live databases and hands out new handles on
//! the shared state instead of reopening.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use tracing::{info, instrument};

use vecblock_storage::Namespace;
use vecblock_types::{DeleteStatus, OpenStatus, Settings, StorageSettings, VecBlockError};

use crate::database::{Database, DatabaseInner};

/// Longest accepted database or collection name, in bytes
pub const MAX_NAME_LEN: usize = 255;

/// Check a database or collection name.
pub fn validate_name(what: &str, name: &str) -> Result<(), VecBlockError> {
    let problem = if name.is_empty() {
        Some("it is empty".to_string())
    } else if name.len() > MAX_NAME_LEN {
        Some(format!("it is longer than {} bytes", MAX_NAME_LEN))
    } else if name == "." || name == ".." {
        Some("it is a relative path component".to_string())
    } else if let Some(c) = name.chars().find(|c| matches!(c, '/' | '\\' | ':' | '\0')) {
        Some(format!("it contains {:?}", c))
    } else {
        None
    };

    match problem {
        Some(problem) => Err(VecBlockError::input(format!(
            "Invalid {} name '{}': {}",
            what,
            name.escape_default(),
            problem
        ))),
        None => Ok(()),
    }
}

/// Connection to a data directory of databases.
pub struct Connection {
    data_dir: PathBuf,
    storage: StorageSettings,
    registry: DashMap<String, Weak<DatabaseInner>>,
}

impl Connection {
    /// Connect to `data_dir` with default storage settings.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, VecBlockError> {
        Self::with_storage(data_dir, StorageSettings::default())
    }

    /// Connect using the data directory and storage settings of `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self, VecBlockError> {
        Self::with_storage(settings.expanded_data_dir(), settings.storage.clone())
    }

    pub fn with_storage(
        data_dir: impl AsRef<Path>,
        storage: StorageSettings,
    ) -> Result<Self, VecBlockError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir).map_err(|e| {
            VecBlockError::connection(format!(
                "Cannot use data directory {:?}: {}",
                data_dir, e
            ))
        })?;
        info!(data_dir = ?data_dir, "Connected");

        Ok(Self {
            data_dir,
            storage,
            registry: DashMap::new(),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn database_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    /// Whether a database of this name has been created.
    pub fn database_exists(&self, name: &str) -> Result<bool, VecBlockError> {
        validate_name("database", name)?;
        Ok(Namespace::exists(&self.database_path(name)))
    }

    /// Open a database, creating it if it does not exist.
    #[instrument(skip(self))]
    pub fn open_database(&self, name: &str) -> Result<Database, VecBlockError> {
        validate_name("database", name)?;

        // The entry guard serializes opens of the same name
        match self.registry.entry(name.to_string()) {
            MapEntry::Occupied(mut slot) => {
                if let Some(inner) = slot.get().upgrade() {
                    return Ok(Database::new(inner, OpenStatus::Existing));
                }
                let (inner, status) = self.open_inner(name)?;
                slot.insert(Arc::downgrade(&inner));
                Ok(Database::new(inner, status))
            }
            MapEntry::Vacant(slot) => {
                let (inner, status) = self.open_inner(name)?;
                slot.insert(Arc::downgrade(&inner));
                Ok(Database::new(inner, status))
            }
        }
    }

    fn open_inner(&self, name: &str) -> Result<(Arc<DatabaseInner>, OpenStatus), VecBlockError> {
        let path = self.database_path(name);
        let status = if Namespace::exists(&path) {
            OpenStatus::Existing
        } else {
            OpenStatus::Created
        };

        let ns = Namespace::open(&path, &self.storage).map_err(|e| {
            VecBlockError::open_db(format!("Failed to open database '{}': {}", name, e))
        })?;
        info!(database = %name, %status, "Opened database");
        Ok((Arc::new(DatabaseInner::new(name, &path, ns)), status))
    }

    /// Names of every database under the data directory, sorted.
    pub fn list_databases(&self) -> Result<Vec<String>, VecBlockError> {
        let entries = std::fs::read_dir(&self.data_dir).map_err(|e| {
            VecBlockError::connection(format!(
                "Cannot list data directory {:?}: {}",
                self.data_dir, e
            ))
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                VecBlockError::connection(format!(
                    "Cannot list data directory {:?}: {}",
                    self.data_dir, e
                ))
            })?;
            if !Namespace::exists(&entry.path()) {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Delete a database and every collection in it.
    ///
    /// Refused while any collection of the database is open. Handles still
    /// held on the database fail every later operation.
    #[instrument(skip(self))]
    pub fn delete_database(&self, name: &str) -> Result<DeleteStatus, VecBlockError> {
        validate_name("database", name)?;
        let path = self.database_path(name);
        if !Namespace::exists(&path) {
            return Err(VecBlockError::connection(format!(
                "Cannot delete database '{}': it does not exist",
                name
            )));
        }

        if let MapEntry::Occupied(slot) = self.registry.entry(name.to_string()) {
            if let Some(inner) = slot.get().upgrade() {
                inner.close_for_delete()?;
            }
            slot.remove();
        }

        Namespace::destroy(&path).map_err(|e| {
            VecBlockError::connection(format!("Failed to delete database '{}': {}", name, e))
        })?;
        info!(database = %name, "Deleted database");
        Ok(DeleteStatus::Database(name.to_string()))
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("data_dir", &self.data_dir)
            .field("storage", &self.storage)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use vecblock_types::{ElementType, Entry, ErrorKind};

    fn setup() -> (Connection, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let conn = Connection::open(temp_dir.path()).unwrap();
        (conn, temp_dir)
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("database", "library-2024_v1.db").is_ok());
        let long = "x".repeat(MAX_NAME_LEN + 1);
        for bad in ["", ".", "..", "a/b", "a\\b", "a:b", "a\0b", long.as_str()] {
            let err = validate_name("database", bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Input, "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_open_is_idempotent() {
        let (conn, _temp) = setup();
        let first = conn.open_database("library").unwrap();
        assert_eq!(first.open_status(), OpenStatus::Created);

        let second = conn.open_database("library").unwrap();
        assert_eq!(second.open_status(), OpenStatus::Existing);
        drop(first);
        drop(second);

        let third = conn.open_database("library").unwrap();
        assert_eq!(third.open_status(), OpenStatus::Existing);
    }

    #[test]
    fn test_list_databases() {
        let (conn, _temp) = setup();
        assert!(conn.list_databases().unwrap().is_empty());
        let _b = conn.open_database("beta").unwrap();
        let _a = conn.open_database("alpha").unwrap();
        std::fs::create_dir(conn.data_dir().join("not-a-db")).unwrap();
        assert_eq!(conn.list_databases().unwrap(), vec!["alpha", "beta"]);
    }

    #[test]
    fn test_delete_database() {
        let (conn, _temp) = setup();
        {
            let db = conn.open_database("library").unwrap();
            let mut books = db.open_collection("books").unwrap();
            books.configure(ElementType::Float32, 2).unwrap();
            books
                .operations()
                .unwrap()
                .insert(&Entry::new(1, "a", vec![1.0, 0.0]))
                .unwrap();
        }

        assert_eq!(
            conn.delete_database("library").unwrap(),
            DeleteStatus::Database("library".into())
        );
        assert!(!conn.database_exists("library").unwrap());

        let db = conn.open_database("library").unwrap();
        assert_eq!(db.open_status(), OpenStatus::Created);
        assert!(db.list_collections().unwrap().is_empty());
    }

    #[test]
    fn test_delete_refused_while_collection_open() {
        let (conn, _temp) = setup();
        let db = conn.open_database("library").unwrap();
        let books = db.open_collection("books").unwrap();

        let err = conn.delete_database("library").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(conn.database_exists("library").unwrap());

        books.close();
        conn.delete_database("library").unwrap();

        // The old handle outlived its database
        assert_eq!(db.list_collections().unwrap_err().kind(), ErrorKind::Transaction);
    }

    #[test]
    fn test_delete_missing_database() {
        let (conn, _temp) = setup();
        let err = conn.delete_database("ghost").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[test]
    fn test_from_settings() {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings {
            data_dir: temp_dir.path().join("data").to_string_lossy().to_string(),
            ..Settings::default()
        };
        let conn = Connection::from_settings(&settings).unwrap();
        assert!(conn.data_dir().is_dir());
    }
}
