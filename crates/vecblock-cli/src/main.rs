//! vecblock
//!
//! Command line over embedded vector databases.
//!
//! # Usage
//!
//! ```bash
//! vecblock db list|create|delete|stats|compact
//! vecblock collection --db NAME list|create|delete
//! vecblock insert --db NAME --collection NAME entries.jsonl
//! vecblock search --db NAME --collection NAME --vector 1,0,0 [-k 5] [--where JSON]
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/vecblock/config.toml)
//! 3. Environment variables (VECBLOCK_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use vecblock_cli::{init_logging, load_settings, run, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(
        cli.config.as_deref(),
        cli.log_level.as_deref(),
        cli.data_dir.as_deref(),
    )?;
    init_logging(&settings)?;

    let stdout = std::io::stdout();
    run(cli.command, &settings, &mut stdout.lock())
}
