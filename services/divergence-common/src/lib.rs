//! Divergence Common - Shared configuration, errors, and logging for the
//! divergence analyzer.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Configuration validation
//! - Error types and handling utilities
//! - Logging setup

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod validation;

pub use config::{AnalysisConfig, Config, ObservabilityConfig, ReportConfig};
pub use error::{Error, Result, ResultExt};
pub use validation::{ConfigError, Validate, DEFAULT_THRESHOLD};

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result, ResultExt};
    pub use crate::logging::init_logging;
    pub use crate::validation::{ConfigError, Validate};
}
