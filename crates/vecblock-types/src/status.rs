//! Result payloads for successful operations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of a data operation on a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "index", rename_all = "snake_case")]
pub enum OpStatus {
    Inserted(i64),
    /// Insert skipped: the index was already present. Not an error.
    AlreadyPresent(i64),
    Updated(i64),
    /// Update skipped: the stored entry equals the new one.
    Unchanged(i64),
    Deleted(i64),
    /// Every entry of the collection was removed.
    Cleared,
}

impl OpStatus {
    /// Whether the operation wrote anything.
    pub fn wrote(&self) -> bool {
        !matches!(self, OpStatus::AlreadyPresent(_) | OpStatus::Unchanged(_))
    }
}

impl fmt::Display for OpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpStatus::Inserted(i) => write!(f, "Insert performed at index: {}", i),
            OpStatus::AlreadyPresent(i) => {
                write!(f, "Insert passed. Insert was already performed at index: {}", i)
            }
            OpStatus::Updated(i) => write!(f, "Update performed at index: {}", i),
            OpStatus::Unchanged(i) => write!(
                f,
                "Update passed. The stored entry at index {} equals the given one, nothing to update",
                i
            ),
            OpStatus::Deleted(i) => write!(f, "Delete performed at index: {}", i),
            OpStatus::Cleared => f.write_str("Delete all performed"),
        }
    }
}

/// Outcome of configuring a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigStatus {
    /// No record existed; the requested configuration was persisted.
    Stored,
    /// A matching record existed; nothing was written.
    Verified,
}

impl fmt::Display for ConfigStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigStatus::Stored => f.write_str("Configuration applied and stored"),
            ConfigStatus::Verified => f.write_str("Configuration loaded and verified"),
        }
    }
}

/// Whether opening a database found it or created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenStatus {
    Created,
    Existing,
}

impl fmt::Display for OpenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenStatus::Created => f.write_str("created"),
            OpenStatus::Existing => f.write_str("already exists"),
        }
    }
}

/// Outcome of removing a database or a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum DeleteStatus {
    Database(String),
    Collection(String),
}

impl fmt::Display for DeleteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeleteStatus::Database(name) => write!(f, "Database '{}' deleted", name),
            DeleteStatus::Collection(name) => write!(f, "Collection '{}' deleted", name),
        }
    }
}
