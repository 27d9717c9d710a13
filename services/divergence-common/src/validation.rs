//! Configuration validation.
//!
//! Every check here runs before any event is ingested: a configuration
//! error aborts the run.

use std::collections::HashSet;
use thiserror::Error;

use crate::config::{AnalysisConfig, Config, ObservabilityConfig, ReportConfig};

/// Threshold used when none is configured.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Log formats understood by [`crate::logging::init_logging`].
pub const LOG_FORMATS: &[&str] = &["pretty", "json"];

/// Report formats understood by the report generator.
pub const REPORT_FORMATS: &[&str] = &["table", "text", "markdown", "md", "json"];

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Invalid threshold {value}: must be in (0, 1]")]
    InvalidThreshold { value: f64 },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Topic '{topic}' is listed more than once")]
    DuplicateTopic { topic: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ConfigError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ConfigError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

/// Check that a threshold lies in (0, 1].
pub fn validate_threshold(value: f64) -> ValidationResult<f64> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err(ConfigError::InvalidThreshold { value })
    }
}

/// Reject a blank or whitespace-only topic name. `field` names the
/// setting in the error.
pub fn validate_topic_name(field: &str, topic: &str) -> ValidationResult<()> {
    if topic.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: field.into(),
            reason: "topic names must not be blank".into(),
        });
    }
    Ok(())
}

/// Check a topic list for blank and duplicate names.
pub fn validate_topics(topics: &[String]) -> ValidationResult<()> {
    let mut seen = HashSet::new();
    for topic in topics {
        validate_topic_name("analysis.topics", topic)?;
        if !seen.insert(topic.as_str()) {
            return Err(ConfigError::DuplicateTopic {
                topic: topic.clone(),
            });
        }
    }
    Ok(())
}

impl Validate for Config {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors: Vec<ConfigError> = [
            self.analysis.validate(),
            self.report.validate(),
            self.observability.validate(),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect();

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ConfigError::Multiple(errors))
        }
    }
}

impl Validate for AnalysisConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.subject.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "analysis.subject".into(),
            });
        }
        validate_threshold(self.threshold)?;
        validate_topics(&self.topics)
    }
}

impl Validate for ReportConfig {
    fn validate(&self) -> ValidationResult<()> {
        let format = self.format.to_lowercase();
        if !REPORT_FORMATS.contains(&format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "report.format".into(),
                reason: format!("expected one of {}", REPORT_FORMATS.join(", ")),
            });
        }
        Ok(())
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        if !LOG_FORMATS.contains(&self.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "observability.log_format".into(),
                reason: format!("expected one of {}", LOG_FORMATS.join(", ")),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0.5 ; "default")]
    #[test_case(1.0 ; "upper bound inclusive")]
    #[test_case(0.001 ; "small positive")]
    fn accepts_threshold(value: f64) {
        assert_eq!(validate_threshold(value), Ok(value));
    }

    #[test_case(0.0 ; "zero")]
    #[test_case(-0.2 ; "negative")]
    #[test_case(1.5 ; "above one")]
    #[test_case(f64::NAN ; "nan")]
    fn rejects_threshold(value: f64) {
        assert!(matches!(
            validate_threshold(value),
            Err(ConfigError::InvalidThreshold { .. })
        ));
    }

    #[test]
    fn test_duplicate_topics_rejected() {
        let topics = vec!["audit".to_string(), "hiring".to_string(), "audit".to_string()];
        assert_eq!(
            validate_topics(&topics),
            Err(ConfigError::DuplicateTopic {
                topic: "audit".into()
            })
        );
    }

    #[test_case("" ; "empty")]
    #[test_case("   " ; "spaces")]
    #[test_case("\t\n" ; "control whitespace")]
    fn rejects_blank_topic(topic: &str) {
        assert!(matches!(
            validate_topic_name("topics", topic),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "topics"
        ));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_multiple_errors_collected() {
        let mut config = Config::default();
        config.analysis.threshold = 0.0;
        config.observability.log_format = "xml".into();

        match config.validate() {
            Err(ConfigError::Multiple(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected multiple errors, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_report_format() {
        let mut config = Config::default();
        config.report.format = "pdf".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "report.format"
        ));
    }
}
