//! # vecblock-types
//!
//! Shared domain types for vecblock, an embeddable vector database.
//!
//! - [`Entry`]: one stored record (index, text, vector, metadata)
//! - [`ElementType`] and [`Metric`]: closed enumerations of element layouts and distances
//! - [`VecBlockError`]: the single error type every public operation returns
//! - [`Settings`]: layered configuration

pub mod config;
pub mod dtype;
pub mod entry;
pub mod error;
pub mod metric;
pub mod status;

pub use config::{Settings, StorageSettings};
pub use dtype::ElementType;
pub use entry::{Entry, Metadata, SearchHit};
pub use error::{ErrorKind, Result, VecBlockError};
pub use metric::Metric;
pub use status::{ConfigStatus, DeleteStatus, OpStatus, OpenStatus};
