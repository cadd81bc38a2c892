//! Configuration loading for vecblock.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/vecblock/config.toml.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::VecBlockError;
use crate::metric::Metric;

/// RocksDB tuning for every database namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Zstd-compress collection tables.
    #[serde(default = "default_compression")]
    pub compression: bool,

    /// Background flush/compaction jobs per database.
    #[serde(default = "default_max_background_jobs")]
    pub max_background_jobs: i32,
}

fn default_compression() -> bool {
    true
}

fn default_max_background_jobs() -> i32 {
    2
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            compression: default_compression(),
            max_background_jobs: default_max_background_jobs(),
        }
    }
}

/// Main settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory holding one sub-directory per database
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Metric used by search when the caller names none
    #[serde(default)]
    pub default_metric: Metric,

    /// Result count used by search when the caller names none
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    #[serde(default)]
    pub storage: StorageSettings,
}

fn default_data_dir() -> String {
    ProjectDirs::from("", "", "vecblock")
        .map(|p| p.data_local_dir().join("databases"))
        .unwrap_or_else(|| PathBuf::from("./vecblock-data"))
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_top_k() -> usize {
    5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            default_metric: Metric::default(),
            default_top_k: default_top_k(),
            storage: StorageSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/vecblock/config.toml)
    /// 3. Explicit config file (optional)
    /// 4. Environment variables (VECBLOCK_*)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(config_path: Option<&str>) -> Result<Self, VecBlockError> {
        let config_dir = ProjectDirs::from("", "", "vecblock")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("data_dir", default_data_dir())
            .map_err(|e| VecBlockError::config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| VecBlockError::config(e.to_string()))?
            .set_default("default_metric", Metric::default().as_str())
            .map_err(|e| VecBlockError::config(e.to_string()))?
            .set_default("default_top_k", default_top_k() as i64)
            .map_err(|e| VecBlockError::config(e.to_string()))?
            .set_default("storage.compression", default_compression())
            .map_err(|e| VecBlockError::config(e.to_string()))?
            .set_default(
                "storage.max_background_jobs",
                default_max_background_jobs() as i64,
            )
            .map_err(|e| VecBlockError::config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // VECBLOCK_DATA_DIR, VECBLOCK_STORAGE__COMPRESSION, ...
        builder = builder.add_source(
            Environment::with_prefix("VECBLOCK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder
            .build()
            .map_err(|e| VecBlockError::config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| VecBlockError::config(e.to_string()))?;

        settings.validate().map_err(VecBlockError::config)?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.default_top_k == 0 {
            return Err("default_top_k must be > 0".to_string());
        }
        if self.storage.max_background_jobs < 1 {
            return Err(format!(
                "storage.max_background_jobs must be >= 1, got {}",
                self.storage.max_background_jobs
            ));
        }
        Ok(())
    }

    /// Expand ~ in data_dir to the home directory
    pub fn expanded_data_dir(&self) -> PathBuf {
        if let Some(rest) = self.data_dir.strip_prefix("~/") {
            if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
                return home.join(rest);
            }
        }
        PathBuf::from(&self.data_dir)
    }
}
