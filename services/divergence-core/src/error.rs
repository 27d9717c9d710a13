//! Error taxonomy for event ingestion and analysis.
//!
//! - [`ValidationError`]: a malformed or out-of-range event. Recovered by
//!   skipping that record.
//! - [`ConfigError`]: an invalid threshold or topic configuration. Fatal,
//!   raised before any analysis.
//! - [`EmptyInputError`]: a requested topic has no events in either group.
//!   Reported per topic.

use thiserror::Error;

pub use divergence_common::ConfigError;

/// Result type alias using the core error type.
pub type Result<T> = std::result::Result<T, Error>;

/// A single event failed validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("event topic must not be blank")]
    BlankTopic,

    #[error("topic '{topic}': {field} = {value} is out of range ({expected})")]
    OutOfRange {
        topic: String,
        field: &'static str,
        value: f64,
        expected: &'static str,
    },

    #[error("line {line}: malformed record: {reason}")]
    Malformed { line: usize, reason: String },
}

/// A requested topic has zero events in both actor groups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("topic '{topic}' has no events in either group")]
pub struct EmptyInputError {
    pub topic: String,
}

/// Unified error type for the analysis core.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Empty input: {0}")]
    EmptyInput(#[from] EmptyInputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the run must stop. Validation and empty-input errors are
    /// recoverable per record or per topic.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Io(_))
    }
}
