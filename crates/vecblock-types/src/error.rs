//! Error types for vecblock.
//!
//! Every public operation fails with exactly one [`VecBlockError`]. Each
//! variant carries a message describing what was attempted and on which key.

use thiserror::Error;

/// Unified error type for vecblock operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VecBlockError {
    /// Malformed or mistyped arguments, detected before any backend call
    #[error("Input error: {0}")]
    Input(String),

    /// Backend unavailable, or a database could not be found or removed
    #[error("Connection error: {0}")]
    Connection(String),

    /// Database could not be opened or created
    #[error("Open database error: {0}")]
    OpenDb(String),

    /// Collection could not be opened, created or dropped
    #[error("Open collection error: {0}")]
    OpenCollection(String),

    /// Collection configuration mismatch or config table corruption
    #[error("Config block error: {0}")]
    Config(String),

    /// Backend transaction could not be started or committed
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Data-path failure (dimension/type mismatch, missing index, codec or backend failure)
    #[error("Operations error: {0}")]
    Operations(String),
}

/// Discriminant of [`VecBlockError`], for exhaustive matching without the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Input,
    Connection,
    OpenDb,
    OpenCollection,
    Config,
    Transaction,
    Operations,
}

impl VecBlockError {
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn open_db(msg: impl Into<String>) -> Self {
        Self::OpenDb(msg.into())
    }

    pub fn open_collection(msg: impl Into<String>) -> Self {
        Self::OpenCollection(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }

    pub fn operations(msg: impl Into<String>) -> Self {
        Self::Operations(msg.into())
    }

    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Input(_) => ErrorKind::Input,
            Self::Connection(_) => ErrorKind::Connection,
            Self::OpenDb(_) => ErrorKind::OpenDb,
            Self::OpenCollection(_) => ErrorKind::OpenCollection,
            Self::Config(_) => ErrorKind::Config,
            Self::Transaction(_) => ErrorKind::Transaction,
            Self::Operations(_) => ErrorKind::Operations,
        }
    }

    /// Get the context message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Input(m)
            | Self::Connection(m)
            | Self::OpenDb(m)
            | Self::OpenCollection(m)
            | Self::Config(m)
            | Self::Transaction(m)
            | Self::Operations(m) => m,
        }
    }
}

/// Convenience alias used across the vecblock crates.
pub type Result<T, E = VecBlockError> = std::result::Result<T, E>;
