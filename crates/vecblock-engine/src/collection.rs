//! Collections and their configuration state machine.
//!
//! A collection starts unconfigured. `configure` either verifies the
//! persisted configuration or, on first use of the name, creates the
//! collection table together with its configuration record. Once configured
//! the element type and dimension never change.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use vecblock_storage::{collection_cf_name, ConfigKey, Namespace, CF_CONFIG_BLOCK};
use vecblock_types::{ConfigStatus, ElementType, VecBlockError};

use crate::database::DatabaseInner;
use crate::operations::Operations;

/// Persisted schema of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub element_type: ElementType,
    pub dimension: usize,
}

impl CollectionConfig {
    /// Read the stored configuration of `collection`, if any.
    pub(crate) fn read(
        ns: &Namespace,
        collection: &str,
    ) -> Result<Option<CollectionConfig>, VecBlockError> {
        if !ns.has_table(CF_CONFIG_BLOCK) {
            return Ok(None);
        }
        let bytes = ns
            .get(CF_CONFIG_BLOCK, &ConfigKey::new(collection).to_bytes())
            .map_err(|e| {
                VecBlockError::config(format!(
                    "Failed to read configuration of collection '{}': {}",
                    collection, e
                ))
            })?;
        match bytes {
            Some(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| {
                VecBlockError::config(format!(
                    "Corrupt configuration record for collection '{}': {}",
                    collection, e
                ))
            }),
            None => Ok(None),
        }
    }

    fn write(&self, ns: &Namespace, collection: &str) -> Result<(), VecBlockError> {
        let value = serde_json::to_vec(self).map_err(|e| {
            VecBlockError::config(format!(
                "Failed to serialize configuration of collection '{}': {}",
                collection, e
            ))
        })?;
        ns.put(CF_CONFIG_BLOCK, &ConfigKey::new(collection).to_bytes(), &value)
            .map_err(|e| {
                VecBlockError::config(format!(
                    "Failed to store configuration of collection '{}': {}",
                    collection, e
                ))
            })
    }

    fn verify(&self, requested: &CollectionConfig, collection: &str) -> Result<(), VecBlockError> {
        if self != requested {
            return Err(VecBlockError::config(format!(
                "Collection '{}' is configured as ({}, {}); requested ({}, {}). Configuration is immutable",
                collection,
                self.element_type,
                self.dimension,
                requested.element_type,
                requested.dimension
            )));
        }
        Ok(())
    }
}

enum State {
    Unconfigured,
    Configured(Operations),
}

/// An open collection.
///
/// Closing (or dropping) the collection releases the exclusivity of the
/// database handle it was opened through.
pub struct Collection {
    db: Arc<DatabaseInner>,
    name: String,
    busy: Arc<AtomicBool>,
    state: State,
    released: bool,
}

impl Collection {
    pub(crate) fn new(db: Arc<DatabaseInner>, name: &str, busy: Arc<AtomicBool>) -> Self {
        Self {
            db,
            name: name.to_string(),
            busy,
            state: State::Unconfigured,
            released: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_configured(&self) -> bool {
        matches!(self.state, State::Configured(_))
    }

    pub fn config(&self) -> Option<CollectionConfig> {
        match &self.state {
            State::Configured(ops) => Some(ops.config()),
            State::Unconfigured => None,
        }
    }

    /// Configure the collection, creating it on first use of its name.
    ///
    /// Returns `Stored` when the configuration was persisted now and
    /// `Verified` when a matching one already existed. A different stored
    /// configuration is a config error.
    #[instrument(skip(self), fields(collection = %self.name))]
    pub fn configure(
        &mut self,
        element_type: ElementType,
        dimension: usize,
    ) -> Result<ConfigStatus, VecBlockError> {
        if dimension == 0 {
            return Err(VecBlockError::input(
                "Invalid dimension 0. Dimension should be a positive integer",
            ));
        }
        let requested = CollectionConfig {
            element_type,
            dimension,
        };

        if let State::Configured(ops) = &self.state {
            ops.config().verify(&requested, &self.name)?;
            return Ok(ConfigStatus::Verified);
        }

        let name = self.name.clone();
        let status = self.db.write(|ns| {
            let table = collection_cf_name(&name);
            if let Some(stored) = CollectionConfig::read(ns, &name)? {
                stored.verify(&requested, &name)?;
                if !ns.has_table(&table) {
                    return Err(VecBlockError::config(format!(
                        "Collection '{}' has a configuration but no table",
                        name
                    )));
                }
                return Ok(ConfigStatus::Verified);
            }

            let version = ns.create_tables(&[CF_CONFIG_BLOCK, &table]).map_err(|e| {
                VecBlockError::open_collection(format!(
                    "Failed to create collection '{}': {}",
                    name, e
                ))
            })?;
            requested.write(ns, &name)?;
            info!(collection = %name, %element_type, dimension, version, "Created collection");
            Ok(ConfigStatus::Stored)
        })?;

        self.state = State::Configured(Operations::new(
            Arc::clone(&self.db),
            &self.name,
            requested,
        ));
        debug!(%status, "Collection configured");
        Ok(status)
    }

    /// Adopt the stored configuration without naming it.
    pub fn load(&mut self) -> Result<ConfigStatus, VecBlockError> {
        if self.is_configured() {
            return Ok(ConfigStatus::Verified);
        }

        let config = self
            .db
            .read(|ns| CollectionConfig::read(ns, &self.name))?
            .ok_or_else(|| {
                VecBlockError::config(format!(
                    "Collection '{}' has no stored configuration. Configure it first",
                    self.name
                ))
            })?;

        self.state = State::Configured(Operations::new(Arc::clone(&self.db), &self.name, config));
        Ok(ConfigStatus::Verified)
    }

    /// The data operations of a configured collection.
    pub fn operations(&self) -> Result<&Operations, VecBlockError> {
        match &self.state {
            State::Configured(ops) => Ok(ops),
            State::Unconfigured => Err(VecBlockError::config(format!(
                "Collection '{}' is not configured. Call configure or load first",
                self.name
            ))),
        }
    }

    /// Close the collection, releasing its database handle.
    pub fn close(self) {
        drop(self);
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.db.collection_closed(&self.name);
        self.busy.store(false, Ordering::Release);
        info!(collection = %self.name, "Closed collection");
    }
}

impl Drop for Collection {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("database", &self.db.name())
            .field("config", &self.config())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;
    use tempfile::TempDir;
    use vecblock_types::ErrorKind;

    fn setup() -> (Connection, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let conn = Connection::open(temp_dir.path()).unwrap();
        (conn, temp_dir)
    }

    #[test]
    fn test_configure_stores_then_verifies() {
        let (conn, _temp) = setup();
        let db = conn.open_database("db").unwrap();

        let mut books = db.open_collection("books").unwrap();
        assert!(!books.is_configured());
        assert_eq!(
            books.configure(ElementType::Float32, 3).unwrap(),
            ConfigStatus::Stored
        );
        assert_eq!(
            books.configure(ElementType::Float32, 3).unwrap(),
            ConfigStatus::Verified
        );
        books.close();

        let mut books = db.open_collection("books").unwrap();
        assert_eq!(
            books.configure(ElementType::Float32, 3).unwrap(),
            ConfigStatus::Verified
        );
    }

    #[test]
    fn test_configuration_is_immutable() {
        let (conn, _temp) = setup();
        let db = conn.open_database("db").unwrap();

        let mut books = db.open_collection("books").unwrap();
        books.configure(ElementType::Float32, 3).unwrap();
        let err = books.configure(ElementType::Float32, 4).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        books.close();

        let mut books = db.open_collection("books").unwrap();
        let err = books.configure(ElementType::Uint8, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(!books.is_configured());
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let (conn, _temp) = setup();
        let db = conn.open_database("db").unwrap();
        let mut books = db.open_collection("books").unwrap();
        let err = books.configure(ElementType::Float32, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn test_operations_require_configuration() {
        let (conn, _temp) = setup();
        let db = conn.open_database("db").unwrap();
        let books = db.open_collection("books").unwrap();
        assert_eq!(books.operations().unwrap_err().kind(), ErrorKind::Config);
    }

    #[test]
    fn test_load_adopts_stored_config() {
        let (conn, _temp) = setup();
        let db = conn.open_database("db").unwrap();
        {
            let mut books = db.open_collection("books").unwrap();
            books.configure(ElementType::Int16, 4).unwrap();
        }

        let mut books = db.open_collection("books").unwrap();
        assert_eq!(books.load().unwrap(), ConfigStatus::Verified);
        assert_eq!(
            books.config(),
            Some(CollectionConfig {
                element_type: ElementType::Int16,
                dimension: 4
            })
        );
        assert_eq!(books.operations().unwrap().dimension(), 4);
    }

    #[test]
    fn test_load_without_config_fails() {
        let (conn, _temp) = setup();
        let db = conn.open_database("db").unwrap();
        let mut books = db.open_collection("books").unwrap();
        assert_eq!(books.load().unwrap_err().kind(), ErrorKind::Config);
    }

    #[test]
    fn test_config_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let conn = Connection::open(temp_dir.path()).unwrap();
            let db = conn.open_database("db").unwrap();
            let mut books = db.open_collection("books").unwrap();
            books.configure(ElementType::Float64, 2).unwrap();
        }

        let conn = Connection::open(temp_dir.path()).unwrap();
        let db = conn.open_database("db").unwrap();
        let mut books = db.open_collection("books").unwrap();
        assert_eq!(books.configure(ElementType::Float64, 2).unwrap(), ConfigStatus::Verified);
        assert_eq!(
            books.configure(ElementType::Float64, 3).unwrap_err().kind(),
            ErrorKind::Config
        );
    }
}
