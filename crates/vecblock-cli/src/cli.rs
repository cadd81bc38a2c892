//! CLI argument parsing for vecblock.
//!
//! Flags given here override every other configuration source.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// vecblock
///
/// Inspect and edit embedded vector databases.
#[derive(Parser, Debug)]
#[command(name = "vecblock")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/vecblock/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override the directory holding the databases
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage databases
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },

    /// Manage collections of a database
    Collection {
        /// Database name
        #[arg(long)]
        db: String,

        #[command(subcommand)]
        command: CollectionCommands,
    },

    /// Insert entries from a JSON-lines file
    Insert {
        #[command(flatten)]
        target: Target,

        /// File with one `{"index", "text", "vector", "metadata"}` object per line
        file: PathBuf,
    },

    /// Print entries by index
    Get {
        #[command(flatten)]
        target: Target,

        /// Indexes to fetch
        #[arg(required = true, allow_negative_numbers = true)]
        indices: Vec<i64>,
    },

    /// Delete entries
    Delete {
        #[command(flatten)]
        target: Target,

        /// Delete every entry of the collection
        #[arg(long, conflicts_with = "index")]
        all: bool,

        /// Index to delete
        #[arg(required_unless_present = "all", allow_negative_numbers = true)]
        index: Option<i64>,
    },

    /// Nearest-neighbor search
    Search {
        #[command(flatten)]
        target: Target,

        /// Query vector, comma separated
        #[arg(long, value_delimiter = ',', required = true, allow_hyphen_values = true)]
        vector: Vec<f64>,

        /// Distance metric: cosine, l2, hamming, normHamming (default from config)
        #[arg(short, long)]
        metric: Option<String>,

        /// Number of results (default from config)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Metadata filter as JSON, e.g. '{"lang": {"$eq": "en"}}'
        #[arg(short, long = "where")]
        filter: Option<String>,
    },
}

/// The collection a data command works on
#[derive(Args, Debug, Clone)]
pub struct Target {
    /// Database name
    #[arg(long)]
    pub db: String,

    /// Collection name
    #[arg(long)]
    pub collection: String,
}

/// Database subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum DbCommands {
    /// List databases
    List,

    /// Create a database (no-op if it exists)
    Create {
        name: String,
    },

    /// Delete a database and all its collections
    Delete {
        name: String,
    },

    /// Show schema version, collections and disk usage
    Stats {
        name: String,
    },

    /// Flush and compact a database
    Compact {
        name: String,
    },
}

/// Collection subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum CollectionCommands {
    /// List collections
    List,

    /// Create a collection, or verify an existing one has this configuration
    Create {
        name: String,

        /// Element type: float32, float64, int8, uint8, int16, uint16, int32, uint32
        #[arg(short, long, default_value = "float32")]
        element_type: String,

        /// Vector dimension
        #[arg(short, long)]
        dimension: usize,
    },

    /// Delete a collection and its entries
    Delete {
        name: String,
    },
}
