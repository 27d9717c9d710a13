//! Threshold classification of differentials.

use serde::{Deserialize, Serialize};

use crate::analyzer::DifferentialResult;
use crate::error::ConfigError;
use divergence_common::validation::validate_threshold;
pub use divergence_common::DEFAULT_THRESHOLD;

/// Outcome of comparing a differential against the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Divergent,
    WithinBounds,
}

impl Classification {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Divergent => "divergent",
            Self::WithinBounds => "within_bounds",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stateless predicate over differentials with a validated threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdClassifier {
    threshold: f64,
}

impl ThresholdClassifier {
    /// Fails with [`ConfigError::InvalidThreshold`] unless `threshold` is in (0, 1].
    pub fn new(threshold: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            threshold: validate_threshold(threshold)?,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// A missing differential is never divergent.
    pub fn classify_differential(&self, differential: Option<f64>) -> Classification {
        match differential {
            Some(d) if d.abs() >= self.threshold => Classification::Divergent,
            _ => Classification::WithinBounds,
        }
    }

    pub fn classify(&self, result: &DifferentialResult) -> Classification {
        self.classify_differential(result.differential)
    }
}

impl Default for ThresholdClassifier {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Classify one result against a caller-supplied threshold.
pub fn classify(result: &DifferentialResult, threshold: f64) -> Result<Classification, ConfigError> {
    Ok(ThresholdClassifier::new(threshold)?.classify(result))
}
