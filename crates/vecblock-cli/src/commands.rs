//! Command implementations for the vecblock CLI.
//!
//! Each handler writes human-readable output to the given writer so the
//! commands can be exercised without a terminal.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use vecblock_engine::{Collection, Connection, Database, Filter, SearchQuery};
use vecblock_types::{ElementType, Entry, Metric, Settings};

use crate::cli::{CollectionCommands, Commands, DbCommands, Target};

/// Load settings and apply CLI overrides (highest precedence).
pub fn load_settings(
    config_path: Option<&str>,
    log_level_override: Option<&str>,
    data_dir_override: Option<&str>,
) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;

    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }
    if let Some(data_dir) = data_dir_override {
        settings.data_dir = data_dir.to_string();
    }
    Ok(settings)
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Run one parsed command against the configured data directory.
pub fn run(command: Commands, settings: &Settings, out: &mut impl Write) -> Result<()> {
    let conn = Connection::from_settings(settings).context("Failed to open data directory")?;
    info!(data_dir = ?conn.data_dir(), "Running command");

    match command {
        Commands::Db { command } => handle_db(&conn, command, out),
        Commands::Collection { db, command } => handle_collection(&conn, &db, command, out),
        Commands::Insert { target, file } => insert_from_file(&conn, &target, &file, out),
        Commands::Get { target, indices } => get_entries(&conn, &target, &indices, out),
        Commands::Delete { target, all, index } => {
            delete_entries(&conn, &target, all, index, out)
        }
        Commands::Search {
            target,
            vector,
            metric,
            top_k,
            filter,
        } => {
            let metric = match metric {
                Some(name) => name.parse::<Metric>()?,
                None => settings.default_metric,
            };
            let filter = match filter {
                Some(json) => {
                    let value: serde_json::Value =
                        serde_json::from_str(&json).context("--where is not valid JSON")?;
                    Filter::from_json(&value)?
                }
                None => Filter::empty(),
            };
            let query = SearchQuery::new(vector)
                .with_metric(metric)
                .with_top_k(top_k.unwrap_or(settings.default_top_k))
                .with_filter(filter);
            search(&conn, &target, &query, out)
        }
    }
}

/// Handle `db` subcommands.
pub fn handle_db(conn: &Connection, command: DbCommands, out: &mut impl Write) -> Result<()> {
    match command {
        DbCommands::List => {
            let names = conn.list_databases()?;
            if names.is_empty() {
                writeln!(out, "No databases in {:?}", conn.data_dir())?;
            }
            for name in names {
                writeln!(out, "{}", name)?;
            }
        }
        DbCommands::Create { name } => {
            let db = conn
                .open_database(&name)
                .with_context(|| format!("Failed to open database '{}'", name))?;
            writeln!(out, "Database '{}' {}", name, db.open_status())?;
        }
        DbCommands::Delete { name } => {
            let status = conn.delete_database(&name)?;
            writeln!(out, "{}", status)?;
        }
        DbCommands::Compact { name } => {
            let db = open_existing(conn, &name)?;
            db.compact()
                .with_context(|| format!("Failed to compact database '{}'", name))?;
            writeln!(out, "Database '{}' compacted", name)?;
        }
        DbCommands::Stats { name } => {
            let db = open_existing(conn, &name)?;
            let stats = db.stats()?;
            writeln!(out, "Database:        {}", stats.name)?;
            writeln!(out, "Path:            {:?}", stats.path)?;
            writeln!(out, "Schema version:  {}", stats.schema_version)?;
            writeln!(out, "Disk usage:      {} bytes", stats.disk_usage_bytes)?;
            writeln!(out, "Collections:     {}", stats.collections.len())?;
            for collection in stats.collections {
                let config = collection
                    .config
                    .map(|c| format!("{} x {}", c.element_type, c.dimension))
                    .unwrap_or_else(|| "unconfigured".to_string());
                writeln!(
                    out,
                    "  {:<24} {:>10} entries  {}",
                    collection.name, collection.entries, config
                )?;
            }
        }
    }
    Ok(())
}

/// Handle `collection` subcommands.
pub fn handle_collection(
    conn: &Connection,
    db_name: &str,
    command: CollectionCommands,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        CollectionCommands::List => {
            let db = open_existing(conn, db_name)?;
            for name in db.list_collections()? {
                writeln!(out, "{}", name)?;
            }
        }
        CollectionCommands::Create {
            name,
            element_type,
            dimension,
        } => {
            let element_type: ElementType = element_type.parse()?;
            let db = conn.open_database(db_name)?;
            let mut collection = db.open_collection(&name)?;
            let status = collection.configure(element_type, dimension)?;
            writeln!(out, "Collection '{}': {}", name, status)?;
        }
        CollectionCommands::Delete { name } => {
            let db = open_existing(conn, db_name)?;
            let status = db.delete_collection(&name)?;
            writeln!(out, "{}", status)?;
        }
    }
    Ok(())
}

fn open_existing(conn: &Connection, name: &str) -> Result<Database> {
    if !conn.database_exists(name)? {
        bail!("Database '{}' does not exist", name);
    }
    conn.open_database(name)
        .with_context(|| format!("Failed to open database '{}'", name))
}

/// Open a configured collection of an existing database.
fn open_target(conn: &Connection, target: &Target) -> Result<(Database, Collection)> {
    let db = open_existing(conn, &target.db)?;
    let mut collection = db.open_collection(&target.collection)?;
    collection
        .load()
        .with_context(|| format!("Collection '{}' is not usable", target.collection))?;
    Ok((db, collection))
}

/// Insert every entry of a JSON-lines file in one batch.
pub fn insert_from_file(
    conn: &Connection,
    target: &Target,
    file: &Path,
    out: &mut impl Write,
) -> Result<()> {
    let content =
        fs::read_to_string(file).with_context(|| format!("Failed to read {:?}", file))?;

    let mut entries = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: serde_json::Value = serde_json::from_str(line)
            .with_context(|| format!("Line {} is not valid JSON", line_no + 1))?;
        let entry = Entry::from_json(value).with_context(|| format!("Line {}", line_no + 1))?;
        entries.push(entry);
    }
    debug!(count = entries.len(), "Parsed entries");

    let (_db, collection) = open_target(conn, target)?;
    let results = collection.operations()?.insert_many(&entries)?;

    let mut failed = 0;
    for (entry, result) in entries.iter().zip(results) {
        match result {
            Ok(status) => writeln!(out, "{}", status)?,
            Err(e) => {
                failed += 1;
                writeln!(out, "Index {}: {}", entry.index, e)?;
            }
        }
    }
    writeln!(
        out,
        "{} entries processed, {} failed",
        entries.len(),
        failed
    )?;
    Ok(())
}

/// Print entries as JSON lines.
pub fn get_entries(
    conn: &Connection,
    target: &Target,
    indices: &[i64],
    out: &mut impl Write,
) -> Result<()> {
    let (_db, collection) = open_target(conn, target)?;
    let results = collection.operations()?.get_by_indices(indices)?;
    for (index, result) in indices.iter().zip(results) {
        match result {
            Ok(entry) => writeln!(out, "{}", serde_json::to_string(&entry)?)?,
            Err(e) => writeln!(out, "Index {}: {}", index, e)?,
        }
    }
    Ok(())
}

/// Delete one entry or all of them.
pub fn delete_entries(
    conn: &Connection,
    target: &Target,
    all: bool,
    index: Option<i64>,
    out: &mut impl Write,
) -> Result<()> {
    let (_db, collection) = open_target(conn, target)?;
    let ops = collection.operations()?;
    let status = match (all, index) {
        (true, _) => ops.delete_all()?,
        (false, Some(index)) => ops.delete_by_index(index)?,
        (false, None) => bail!("Give an index to delete, or --all"),
    };
    writeln!(out, "{}", status)?;
    Ok(())
}

/// Print the ranked hits of a search.
pub fn search(
    conn: &Connection,
    target: &Target,
    query: &SearchQuery,
    out: &mut impl Write,
) -> Result<()> {
    let (_db, collection) = open_target(conn, target)?;
    let hits = collection.operations()?.search(query)?;

    for (rank, hit) in hits.iter().enumerate() {
        match &hit.entry {
            Some(entry) => writeln!(
                out,
                "{:>3}. [{}] {:.6}  {}",
                rank + 1,
                entry.index,
                hit.distance,
                entry.text
            )?,
            None => writeln!(out, "{:>3}. (no match)", rank + 1)?,
        }
    }
    Ok(())
}
