//! vecblock command line library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (db, collection, insert, get, delete, search)

pub mod cli;
pub mod commands;

pub use cli::{Cli, CollectionCommands, Commands, DbCommands, Target};
pub use commands::{init_logging, load_settings, run};
