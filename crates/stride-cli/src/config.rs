//! Configuration file management.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stride_core::{DEFAULT_COLLECTION, RepositoryOptions, SCHEMA_VERSION, Zone};

use crate::cli::OutputFormat;

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Time zone for day boundaries: "local", "utc" or an offset like "+02:00"
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Daily step goal used by `summary`
    #[serde(default)]
    pub daily_goal: Option<u32>,

    /// Default output format: "text" or "json"
    #[serde(default)]
    pub format: Option<String>,

    /// Disable colored output
    #[serde(default)]
    pub no_color: bool,

    /// Storage settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database file; the platform data directory when unset
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Collection holding step records
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Schema version the collection is opened at
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
}

fn default_timezone() -> String {
    "local".to_string()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            daily_goal: None,
            format: None,
            no_color: false,
            storage: StorageConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            collection: default_collection(),
            schema_version: default_schema_version(),
        }
    }
}

/// Errors from loading, saving or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single invalid field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field path (e.g., `storage.collection`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

impl Config {
    /// Get the default config file path
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stride")
            .join("config.toml")
    }

    /// Load config from `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Load config from `path`, or defaults when it is missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}; using defaults", e);
                Self::default()
            }
        }
    }

    /// Write config to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Check every field, reporting all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if let Err(e) = self.timezone.parse::<Zone>() {
            errors.push(ValidationError {
                field: "timezone".to_string(),
                message: e.to_string(),
            });
        }

        if let Some(format) = &self.format
            && format.parse::<OutputFormat>().is_err()
        {
            errors.push(ValidationError {
                field: "format".to_string(),
                message: format!("unknown format '{}' (expected text or json)", format),
            });
        }

        if self.daily_goal == Some(0) {
            errors.push(ValidationError {
                field: "daily_goal".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        if self.storage.collection.trim().is_empty() {
            errors.push(ValidationError {
                field: "storage.collection".to_string(),
                message: "cannot be empty".to_string(),
            });
        }

        if self.storage.schema_version == 0 {
            errors.push(ValidationError {
                field: "storage.schema_version".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// The configured zone, falling back to local time.
    pub fn zone(&self) -> Zone {
        self.timezone.parse().unwrap_or_default()
    }

    /// The configured output format, falling back to text.
    pub fn output_format(&self) -> OutputFormat {
        self.format
            .as_deref()
            .and_then(|f| f.parse().ok())
            .unwrap_or_default()
    }

    /// Repository options for the configured collection and zone.
    pub fn repository_options(&self, zone: Zone) -> RepositoryOptions {
        RepositoryOptions::new()
            .collection(self.storage.collection.clone())
            .schema_version(self.storage.schema_version)
            .zone(zone)
    }

    /// Database file to use: explicit flag, then config, then platform default.
    pub fn db_path(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.storage.path.clone())
            .unwrap_or_else(stride_store::default_db_path)
    }
}
