//! Application configuration - ingestion and trend settings as TOML values
//!
//! Every struct implements `Default` with the values the pipeline uses when
//! no config file is present, so an empty file is a valid config.

use crate::acquisition::DEFAULT_CHUNK_SIZE;
use crate::classifier::NumericPolicy;
use crate::trend::{MovingAverageEngine, TrendError, DEFAULT_SLOT_MINUTES, DEFAULT_WINDOW_HOURS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "CARELINK_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "carelink.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with `AppConfig::load()` which searches:
/// 1. `$CARELINK_CONFIG`
/// 2. `./carelink.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Export reading and classification
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Moving-average window and grid
    #[serde(default)]
    pub trend: TrendConfig,
}

impl AppConfig {
    /// Load configuration using the standard search order, falling back to
    /// defaults (with a warning) when a file cannot be used.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No config file found, using built-in defaults");
        Self::default()
    }

    /// Load and validate a specific TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;

        for w in super::validation::validate_unknown_keys(&contents) {
            warn!(path = %path.display(), "{}", w);
        }

        let config: Self = toml::from_str(&contents)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges, reporting every problem at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.ingest.chunk_size == 0 {
            errors.push("ingest.chunk_size must be greater than 0".to_string());
        }
        if !self.trend.window_hours.is_finite() || self.trend.window_hours <= 0.0 {
            errors.push(format!(
                "trend.window_hours ({}) must be a positive number of hours",
                self.trend.window_hours
            ));
        }
        if self.trend.slot_minutes == 0 || 1440 % self.trend.slot_minutes != 0 {
            errors.push(format!(
                "trend.slot_minutes ({}) must divide 1440 evenly",
                self.trend.slot_minutes
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Serialize the effective configuration.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Returned by `load_from_file`, `validate` and `to_toml`; `load()` logs
/// these and falls back.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config parse error ({}): {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Ingest
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Bytes requested from the source per read
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Treatment of non-numeric glucose/insulin/carb cells
    #[serde(default)]
    pub numeric_policy: NumericPolicy,
}

const fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            numeric_policy: NumericPolicy::default(),
        }
    }
}

// ============================================================================
// Trend
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendConfig {
    /// Trailing moving-average window (hours)
    #[serde(default = "default_window_hours")]
    pub window_hours: f64,

    /// Grid spacing (minutes); must divide a day evenly
    #[serde(default = "default_slot_minutes")]
    pub slot_minutes: u32,
}

const fn default_window_hours() -> f64 {
    DEFAULT_WINDOW_HOURS
}

const fn default_slot_minutes() -> u32 {
    DEFAULT_SLOT_MINUTES
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            window_hours: default_window_hours(),
            slot_minutes: default_slot_minutes(),
        }
    }
}

impl TrendConfig {
    pub fn engine(&self) -> Result<MovingAverageEngine, TrendError> {
        MovingAverageEngine::new(self.window_hours, self.slot_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_validates() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok(), "Default config must always validate");
        assert!(config.trend.engine().is_ok());
    }

    #[test]
    fn test_empty_toml_produces_defaults() {
        let config: AppConfig = toml::from_str("").expect("empty TOML should parse");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.ingest.chunk_size, 64 * 1024);
        assert_eq!(config.ingest.numeric_policy, NumericPolicy::Permissive);
        assert_eq!(config.trend.window_hours, 24.0);
        assert_eq!(config.trend.slot_minutes, 15);
    }

    #[test]
    fn test_partial_toml_override() {
        let toml_str = r#"
[ingest]
numeric_policy = "strict"

[trend]
window_hours = 6.0
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("partial TOML should parse");
        assert_eq!(config.ingest.numeric_policy, NumericPolicy::Strict);
        assert_eq!(config.trend.window_hours, 6.0);
        // Non-overridden values retain defaults
        assert_eq!(config.ingest.chunk_size, 64 * 1024);
        assert_eq!(config.trend.slot_minutes, 15);
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = AppConfig::default();
        config.ingest.chunk_size = 0;
        config.trend.window_hours = -1.0;
        config.trend.slot_minutes = 7;

        match config.validate() {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 3, "{errors:?}"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_from_file_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[trend]\nslot_minutes = 0").unwrap();
        let err = AppConfig::load_from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("slot_minutes"), "{err}");
    }

    #[test]
    fn test_error_messages_name_the_problem() {
        let err = ConfigError::Validation(vec!["a is wrong".into(), "b is wrong".into()]);
        assert_eq!(err.to_string(), "Invalid config: a is wrong; b is wrong");

        let missing = AppConfig::load_from_file(Path::new("/nonexistent/carelink.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
        assert!(std::error::Error::source(&missing).is_some());
        assert!(missing.to_string().contains("/nonexistent/carelink.toml"), "{missing}");
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = AppConfig::default();
        config.trend.window_hours = 3.5;
        config.ingest.numeric_policy = NumericPolicy::Strict;
        let text = config.to_toml().unwrap();
        assert!(text.contains("numeric_policy = \"strict\""), "{text}");
        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
