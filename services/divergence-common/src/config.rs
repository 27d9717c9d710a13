//! Configuration for the divergence analyzer.
//!
//! Configuration is read from `~/.divergence/config.json` (or an explicit
//! path) and then overridden by environment variables:
//!
//! - `DIVERGENCE_SUBJECT` → analysis.subject
//! - `DIVERGENCE_THRESHOLD` → analysis.threshold
//! - `DIVERGENCE_LOG_LEVEL` → observability.log_level
//! - `DIVERGENCE_LOG_FORMAT` → observability.log_format
//!
//! Command-line flags are applied last by the binary.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, ResultExt};
use crate::validation::{ConfigError, DEFAULT_THRESHOLD};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".divergence"),
        |dirs| dirs.home_dir().join(".divergence"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Sections
// ============================================================================

/// What to analyse and how strictly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Organisation or subject the event log describes.
    #[serde(default = "default_subject")]
    pub subject: String,

    /// Topics to compare. Empty means every topic found in the input.
    #[serde(default)]
    pub topics: Vec<String>,

    /// Minimum |differential| classified as divergent, in (0, 1].
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            subject: default_subject(),
            topics: Vec::new(),
            threshold: default_threshold(),
        }
    }
}

fn default_subject() -> String {
    "unspecified".to_string()
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

/// Report rendering options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Output format: table, markdown, or json
    #[serde(default = "default_report_format")]
    pub format: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: default_report_format(),
        }
    }
}

fn default_report_format() -> String {
    "table".to_string()
}

/// Logging options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Base log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

// ============================================================================
// Config
// ============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path, falling back to defaults
    /// when the file does not exist.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .context(format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration (explicit path or default) and apply environment
    /// variable overrides.
    pub fn load_with_env(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) -> std::result::Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> std::result::Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(subject) = lookup("DIVERGENCE_SUBJECT") {
            self.analysis.subject = subject;
        }

        if let Some(raw) = lookup("DIVERGENCE_THRESHOLD") {
            self.analysis.threshold =
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        field: "DIVERGENCE_THRESHOLD".into(),
                        reason: format!("'{raw}' is not a number"),
                    })?;
        }

        if let Some(level) = lookup("DIVERGENCE_LOG_LEVEL") {
            self.observability.log_level = level;
        }

        if let Some(format) = lookup("DIVERGENCE_LOG_FORMAT") {
            self.observability.log_format = format;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"analysis": {"subject": "acme", "threshold": 0.3}}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.analysis.subject, "acme");
        assert!((config.analysis.threshold - 0.3).abs() < f64::EPSILON);
        assert!(config.analysis.topics.is_empty());
        assert_eq!(config.report.format, "table");
        assert_eq!(config.observability.log_format, "pretty");
    }

    #[test]
    fn test_malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("DIVERGENCE_SUBJECT", "initech"),
            ("DIVERGENCE_THRESHOLD", "0.25"),
            ("DIVERGENCE_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides_from(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.analysis.subject, "initech");
        assert!((config.analysis.threshold - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.observability.log_format, "json");
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_unparsable_threshold_override() {
        let mut config = Config::default();
        let err = config
            .apply_overrides_from(|key| (key == "DIVERGENCE_THRESHOLD").then(|| "high".into()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
