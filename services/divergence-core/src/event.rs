//! Engagement events.
//!
//! [`NewEvent`] is what arrives from the outside; [`Event`] is what the
//! store holds after validation. An `Event` is never modified once recorded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ValidationError;

/// The cohort an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorGroup {
    Baseline,
    Test,
}

impl ActorGroup {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::Test => "test",
        }
    }
}

impl std::fmt::Display for ActorGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActorGroup {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "baseline" => Ok(Self::Baseline),
            "test" => Ok(Self::Test),
            _ => Err(format!("Unknown actor group: {}", s)),
        }
    }
}

/// An unvalidated event as read from input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewEvent {
    pub topic: String,
    pub actor_group: ActorGroup,
    /// Seconds until a response; `None` means no response was given.
    #[serde(default)]
    pub response_time_secs: Option<f64>,
    pub response_depth: f64,
    #[serde(default)]
    pub attributed: bool,
    pub timestamp: DateTime<Utc>,
}

impl NewEvent {
    /// An unanswered, unattributed event stamped with the current time.
    pub fn new(topic: impl Into<String>, actor_group: ActorGroup) -> Self {
        Self {
            topic: topic.into(),
            actor_group,
            response_time_secs: None,
            response_depth: 0.0,
            attributed: false,
            timestamp: Utc::now(),
        }
    }

    pub fn responded_in(mut self, secs: f64) -> Self {
        self.response_time_secs = Some(secs);
        self
    }

    pub fn with_depth(mut self, depth: f64) -> Self {
        self.response_depth = depth;
        self
    }

    pub fn attributed(mut self, attributed: bool) -> Self {
        self.attributed = attributed;
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Check field ranges and produce the stored form.
    pub fn validate(self, sequence: u64) -> Result<Event, ValidationError> {
        let topic = self.topic.trim();
        if topic.is_empty() {
            return Err(ValidationError::BlankTopic);
        }

        if !(self.response_depth.is_finite() && (0.0..=1.0).contains(&self.response_depth)) {
            return Err(ValidationError::OutOfRange {
                topic: topic.to_string(),
                field: "response_depth",
                value: self.response_depth,
                expected: "0 <= value <= 1",
            });
        }

        let response_time = match self.response_time_secs {
            Some(secs) => match Duration::try_from_secs_f64(secs) {
                Ok(duration) => Some(duration),
                Err(_) => {
                    return Err(ValidationError::OutOfRange {
                        topic: topic.to_string(),
                        field: "response_time_secs",
                        value: secs,
                        expected: "finite value >= 0",
                    })
                }
            },
            None => None,
        };

        Ok(Event {
            sequence,
            topic: topic.to_string(),
            actor_group: self.actor_group,
            response_time,
            response_depth: self.response_depth,
            attributed: self.attributed,
            timestamp: self.timestamp,
        })
    }
}

/// A validated, recorded event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Position in the store, assigned on record.
    pub sequence: u64,
    pub topic: String,
    pub actor_group: ActorGroup,
    pub response_time: Option<Duration>,
    pub response_depth: f64,
    pub attributed: bool,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn responded(&self) -> bool {
        self.response_time.is_some()
    }

    pub fn response_time_secs(&self) -> Option<f64> {
        self.response_time.map(|d| d.as_secs_f64())
    }
}
