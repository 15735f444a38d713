//! Configuration loading for content-sync.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/content-sync/config.toml.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::SyncError;

/// How bulk sync materializes records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Page through full records
    #[default]
    Full,
    /// Page through ids only and fetch each record lazily
    Pending,
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncMode::Full => write!(f, "full"),
            SyncMode::Pending => write!(f, "pending"),
        }
    }
}

impl std::str::FromStr for SyncMode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(SyncMode::Full),
            "pending" => Ok(SyncMode::Pending),
            other => Err(SyncError::InvalidInput(format!(
                "unknown sync mode: {}",
                other
            ))),
        }
    }
}

/// Resolution when one cycle queues both an index and a delete for the
/// same record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The delete is kept regardless of arrival order
    #[default]
    DeleteWins,
    /// Whichever action arrived last is kept
    LastWins,
}

/// Bulk and incremental sync settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Page size for bulk sync
    #[serde(default = "default_per_page")]
    pub per_page: u64,

    /// Default bulk sync mode
    #[serde(default)]
    pub mode: SyncMode,

    /// Run distinct content types concurrently during bulk sync
    #[serde(default = "default_concurrent_types")]
    pub concurrent_types: bool,

    /// Queue tie-break policy
    #[serde(default)]
    pub tie_break: TieBreak,
}

fn default_per_page() -> u64 {
    100
}

fn default_concurrent_types() -> bool {
    true
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
            mode: SyncMode::default(),
            concurrent_types: default_concurrent_types(),
            tie_break: TieBreak::default(),
        }
    }
}

/// Search index settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSettings {
    /// Memory budget for the index writer in MB
    #[serde(default = "default_writer_memory_mb")]
    pub writer_memory_mb: usize,
}

fn default_writer_memory_mb() -> usize {
    50
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            writer_memory_mb: default_writer_memory_mb(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path to the RocksDB record store
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Path to the Tantivy index directory
    #[serde(default = "default_index_path")]
    pub index_path: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Sync settings
    #[serde(default)]
    pub sync: SyncSettings,

    /// Index settings
    #[serde(default)]
    pub index: IndexSettings,
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "content-sync")
}

fn default_db_path() -> String {
    project_dirs()
        .map(|p| p.data_local_dir().join("db"))
        .unwrap_or_else(|| PathBuf::from("./data"))
        .to_string_lossy()
        .to_string()
}

fn default_index_path() -> String {
    project_dirs()
        .map(|p| p.data_local_dir().join("index"))
        .unwrap_or_else(|| PathBuf::from("./index"))
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            index_path: default_index_path(),
            log_level: default_log_level(),
            sync: SyncSettings::default(),
            index: IndexSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/content-sync/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (CONTENT_SYNC_*, nested keys joined by `__`)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, SyncError> {
        let config_dir = project_dirs()
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("db_path", default_db_path())
            .map_err(|e| SyncError::Config(e.to_string()))?
            .set_default("index_path", default_index_path())
            .map_err(|e| SyncError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| SyncError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // CONTENT_SYNC_DB_PATH, CONTENT_SYNC_SYNC__PER_PAGE, ...
        builder = builder.add_source(
            Environment::with_prefix("CONTENT_SYNC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| SyncError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| SyncError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.sync.per_page == 0 {
            return Err(SyncError::Config("sync.per_page must be > 0".to_string()));
        }
        if self.index.writer_memory_mb == 0 {
            return Err(SyncError::Config(
                "index.writer_memory_mb must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Expand ~ in db_path to the home directory
    pub fn expanded_db_path(&self) -> PathBuf {
        expand_home(&self.db_path)
    }

    /// Expand ~ in index_path to the home directory
    pub fn expanded_index_path(&self) -> PathBuf {
        expand_home(&self.index_path)
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(base) = directories::BaseDirs::new() {
            return base.home_dir().join(rest);
        }
    }
    PathBuf::from(path)
}
