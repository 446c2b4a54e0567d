//! # Service Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     VENDO_DB_PATH, VENDO_DB_MAX_CONNECTIONS, VENDO_SALE_PREFIX,        │
//! │     VENDO_EVENT_CAPACITY, VENDO_OUTBOX_ENABLED                          │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     explicit path, or the platform config dir:                          │
//! │     ~/.config/vendo/vendo.toml (Linux)                                 │
//! │     ~/Library/Application Support/com.vendo.vendo/vendo.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/var/lib/vendo/vendo.db"
//! max_connections = 5
//!
//! [sales]
//! number_prefix = "VND"
//!
//! [events]
//! channel_capacity = 256
//! outbox_enabled = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use vendo_core::validation::validate_number_prefix;
use vendo_db::DbConfig;

use crate::number::DEFAULT_PREFIX;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file, or `:memory:`.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("vendo.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesSettings {
    /// First segment of every sale number.
    #[serde(default = "default_number_prefix")]
    pub number_prefix: String,
}

fn default_number_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

impl Default for SalesSettings {
    fn default() -> Self {
        SalesSettings {
            number_prefix: default_number_prefix(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSettings {
    /// Buffer of the in-process event channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Also record every event in `event_outbox`.
    #[serde(default = "default_true")]
    pub outbox_enabled: bool,
}

fn default_channel_capacity() -> usize {
    256
}

fn default_true() -> bool {
    true
}

impl Default for EventSettings {
    fn default() -> Self {
        EventSettings {
            channel_capacity: default_channel_capacity(),
            outbox_enabled: default_true(),
        }
    }
}

// =============================================================================
// Service Config
// =============================================================================

/// Complete service configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub sales: SalesSettings,

    #[serde(default)]
    pub events: EventSettings,
}

impl ServiceConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`config_path`, else the platform `vendo.toml`)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                config = Self::from_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies `VENDO_*` overrides read through `lookup`.
    ///
    /// Unparseable numeric or boolean values are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("VENDO_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(value) = lookup("VENDO_DB_MAX_CONNECTIONS") {
            match value.parse() {
                Ok(max) => self.database.max_connections = max,
                Err(_) => warn!(value = %value, "Ignoring invalid VENDO_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(prefix) = lookup("VENDO_SALE_PREFIX") {
            self.sales.number_prefix = prefix;
        }

        if let Some(value) = lookup("VENDO_EVENT_CAPACITY") {
            match value.parse() {
                Ok(capacity) => self.events.channel_capacity = capacity,
                Err(_) => warn!(value = %value, "Ignoring invalid VENDO_EVENT_CAPACITY"),
            }
        }

        if let Some(value) = lookup("VENDO_OUTBOX_ENABLED") {
            match value.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.events.outbox_enabled = true,
                "0" | "false" | "no" | "off" => self.events.outbox_enabled = false,
                _ => warn!(value = %value, "Ignoring invalid VENDO_OUTBOX_ENABLED"),
            }
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        validate_number_prefix(&self.sales.number_prefix)
            .map_err(|e| ConfigError::Invalid(format!("sales.{}", e)))?;

        if self.events.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "events.channel_capacity must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Pool settings for [`vendo_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        if self.database.path == Path::new(":memory:") {
            return DbConfig::in_memory();
        }
        DbConfig::new(self.database.path.clone()).max_connections(self.database.max_connections)
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "vendo", "vendo")
            .map(|dirs| dirs.config_dir().join("vendo.toml"))
    }
}
