//! # vecblock-engine
//!
//! Embeddable vector database engine.
//!
//! Entries `(index, text, vector, metadata)` are stored in fixed-schema
//! collections and searched exhaustively: every query scans the collection
//! and keeps the `k` closest entries that pass its metadata filter. There is
//! no approximate index.
//!
//! ```no_run
//! use vecblock_engine::{Connection, SearchQuery};
//! use vecblock_types::{ElementType, Entry};
//!
//! # fn main() -> Result<(), vecblock_types::VecBlockError> {
//! let conn = Connection::open("/tmp/vecblock")?;
//! let db = conn.open_database("library")?;
//! let mut books = db.open_collection("books")?;
//! books.configure(ElementType::Float32, 3)?;
//!
//! let ops = books.operations()?;
//! ops.insert(&Entry::new(1, "first", vec![1.0, 0.0, 0.0]))?;
//! let hits = ops.search(&SearchQuery::new(vec![1.0, 0.0, 0.0]).with_top_k(1))?;
//! assert_eq!(hits[0].distance, 0.0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//! - [`codec`]: vector to byte-buffer conversion per element type
//! - [`distance`]: cosine, l2, hamming and normHamming
//! - [`filter`]: metadata predicates (`$eq`, `$gt`, `$in`, ...)
//! - [`search`]: top-K selection over an unordered scan
//! - [`operations`]: CRUD and search on one collection
//! - [`collection`], [`database`], [`connection`]: lifecycle

pub mod codec;
pub mod collection;
pub mod connection;
pub mod database;
pub mod distance;
pub mod filter;
pub mod operations;
pub mod record;
pub mod search;
pub mod utils;

pub use collection::{Collection, CollectionConfig};
pub use connection::{validate_name, Connection};
pub use database::{CollectionStats, Database, DatabaseStats};
pub use filter::{Condition, Filter};
pub use operations::Operations;
pub use search::{SearchQuery, TopK};
pub use utils::{binarize, unique_index};
