//! Divergence Core - event store and differential response analysis.
//!
//! Events describe how a subject engaged with a topic. Each belongs to a
//! `baseline` or a `test` cohort. For every topic the analyzer compares
//! the two cohorts metric by metric and flags differentials whose magnitude
//! reaches a threshold.
//!
//! ```text
//! JSONL ──▶ ingest ──▶ EventStore ──snapshot──▶ DifferentialAnalyzer ──▶ ReportGenerator
//!                                                      │
//!                                             ThresholdClassifier
//! ```

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod aggregate;
pub mod analyzer;
pub mod classifier;
pub mod error;
pub mod event;
pub mod ingest;
pub mod report;
pub mod store;
pub mod summary;

pub use aggregate::{Metric, TopicAggregate};
pub use analyzer::{Analysis, DifferentialAnalyzer, DifferentialResult, SkipReason, SkippedTopic};
pub use classifier::{Classification, ThresholdClassifier, DEFAULT_THRESHOLD};
pub use error::{ConfigError, EmptyInputError, Error, Result, ValidationError};
pub use event::{ActorGroup, Event, NewEvent};
pub use ingest::{ingest_path, ingest_reader, IngestSummary, SkippedRecord};
pub use report::{ReportFormat, ReportGenerator};
pub use store::{EventQuery, EventSnapshot, EventStore};
pub use summary::{DivergencePattern, DivergenceSummary};
