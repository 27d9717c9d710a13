//! Baseline/test differential analysis.
//!
//! For each topic the analyzer aggregates the baseline and test events
//! separately and emits one [`DifferentialResult`] per [`Metric`]:
//!
//! ```text
//! differential = (baseline_value - test_value) / baseline_value
//! ```
//!
//! The differential is `None` when the baseline value is zero. Metrics are
//! never combined into a single score.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use crate::aggregate::{Metric, TopicAggregate};
use crate::classifier::{Classification, ThresholdClassifier};
use divergence_common::validation::validate_topic_name;

use crate::error::{ConfigError, EmptyInputError};
use crate::event::{ActorGroup, Event};
use crate::store::{EventSnapshot, EventStore};

/// Comparison of one metric for one topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DifferentialResult {
    pub topic: String,
    pub metric: Metric,
    pub baseline_value: f64,
    pub test_value: f64,
    pub differential: Option<f64>,
    pub exceeds_threshold: bool,
}

impl DifferentialResult {
    pub fn classification(&self) -> Classification {
        if self.exceeds_threshold {
            Classification::Divergent
        } else {
            Classification::WithinBounds
        }
    }

    pub fn magnitude(&self) -> Option<f64> {
        self.differential.map(f64::abs)
    }
}

/// Relative drop from baseline to test. `None` for a zero baseline.
pub fn relative_differential(baseline: f64, test: f64) -> Option<f64> {
    if baseline == 0.0 {
        return None;
    }
    let differential = (baseline - test) / baseline;
    differential.is_finite().then_some(differential)
}

/// Descending magnitude, undefined differentials last, then topic and metric.
fn result_order(a: &DifferentialResult, b: &DifferentialResult) -> Ordering {
    let by_magnitude = match (a.magnitude(), b.magnitude()) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_magnitude
        .then_with(|| a.topic.cmp(&b.topic))
        .then_with(|| a.metric.cmp(&b.metric))
}

/// Why a topic produced no results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No events in either group.
    NoEvents,
    NoBaseline,
    NoTest,
}

impl SkipReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoEvents => "no_events",
            Self::NoBaseline => "no_baseline",
            Self::NoTest => "no_test",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedTopic {
    pub topic: String,
    pub reason: SkipReason,
    pub baseline_events: usize,
    pub test_events: usize,
}

/// Output of one analysis run.
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Correlates log lines; not part of any report.
    pub run_id: String,
    pub subject: String,
    pub threshold: f64,
    /// Events in the snapshot the run used.
    pub event_count: usize,
    pub results: Vec<DifferentialResult>,
    pub skipped_topics: Vec<SkippedTopic>,
}

impl Analysis {
    pub fn divergent(&self) -> impl Iterator<Item = &DifferentialResult> {
        self.results.iter().filter(|r| r.exceeds_threshold)
    }

    /// Requested topics with no events at all.
    pub fn empty_inputs(&self) -> Vec<EmptyInputError> {
        self.skipped_topics
            .iter()
            .filter(|s| s.reason == SkipReason::NoEvents)
            .map(|s| EmptyInputError {
                topic: s.topic.clone(),
            })
            .collect()
    }
}

/// Computes per-topic differentials for a subject.
#[derive(Debug, Clone)]
pub struct DifferentialAnalyzer {
    subject: String,
    classifier: ThresholdClassifier,
}

impl DifferentialAnalyzer {
    pub fn new(subject: impl Into<String>, classifier: ThresholdClassifier) -> Self {
        Self {
            subject: subject.into(),
            classifier,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn classifier(&self) -> &ThresholdClassifier {
        &self.classifier
    }

    /// Analyse the store as it stands now. Writes that land while the
    /// analysis runs are not seen.
    pub fn analyze(
        &self,
        store: &EventStore,
        topics: &[String],
    ) -> Result<Analysis, ConfigError> {
        self.analyze_snapshot(&store.snapshot(), topics)
    }

    /// Analyse `topics`, or every topic in the snapshot when `topics` is empty.
    ///
    /// Requested names are trimmed and de-duplicated. A blank name is a
    /// [`ConfigError`] and nothing is analysed.
    pub fn analyze_snapshot(
        &self,
        snapshot: &EventSnapshot,
        topics: &[String],
    ) -> Result<Analysis, ConfigError> {
        for topic in topics {
            validate_topic_name("topics", topic)?;
        }

        let run_id = divergence_common::logging::generate_run_id();
        let span = tracing::info_span!("analysis", run_id = %run_id, subject = %self.subject);
        let _enter = span.enter();

        let topics: Vec<String> = if topics.is_empty() {
            snapshot.topics()
        } else {
            topics
                .iter()
                .map(|t| t.trim().to_string())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        };

        let mut by_topic: HashMap<&str, (Vec<&Event>, Vec<&Event>)> = HashMap::new();
        for event in snapshot.iter() {
            let entry = by_topic.entry(event.topic.as_str()).or_default();
            match event.actor_group {
                ActorGroup::Baseline => entry.0.push(event),
                ActorGroup::Test => entry.1.push(event),
            }
        }

        let mut results = Vec::new();
        let mut skipped_topics = Vec::new();
        let empty = (Vec::new(), Vec::new());

        for topic in &topics {
            let (baseline_events, test_events) = by_topic.get(topic.as_str()).unwrap_or(&empty);
            let baseline = TopicAggregate::from_events(topic, baseline_events.iter().copied());
            let test = TopicAggregate::from_events(topic, test_events.iter().copied());

            let (baseline, test) = match (baseline, test) {
                (Some(baseline), Some(test)) => (baseline, test),
                (baseline, test) => {
                    let reason = match (baseline, test) {
                        (None, None) => SkipReason::NoEvents,
                        (None, Some(_)) => SkipReason::NoBaseline,
                        _ => SkipReason::NoTest,
                    };
                    if reason == SkipReason::NoEvents {
                        tracing::warn!(topic = %topic, "{}", EmptyInputError { topic: topic.clone() });
                    } else {
                        tracing::info!(topic = %topic, reason = reason.as_str(), "Skipping topic");
                    }
                    skipped_topics.push(SkippedTopic {
                        topic: topic.clone(),
                        reason,
                        baseline_events: baseline_events.len(),
                        test_events: test_events.len(),
                    });
                    continue;
                }
            };

            for metric in Metric::ALL {
                let baseline_value = baseline.value(metric);
                let test_value = test.value(metric);
                let differential = relative_differential(baseline_value, test_value);
                let exceeds_threshold =
                    self.classifier.classify_differential(differential) == Classification::Divergent;

                results.push(DifferentialResult {
                    topic: topic.clone(),
                    metric,
                    baseline_value,
                    test_value,
                    differential,
                    exceeds_threshold,
                });
            }
        }

        results.sort_by(result_order);

        tracing::info!(
            events = snapshot.len(),
            topics = topics.len(),
            results = results.len(),
            divergent = results.iter().filter(|r| r.exceeds_threshold).count(),
            skipped = skipped_topics.len(),
            "Analysis complete"
        );

        Ok(Analysis {
            run_id,
            subject: self.subject.clone(),
            threshold: self.classifier.threshold(),
            event_count: snapshot.len(),
            results,
            skipped_topics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::NewEvent;

    fn record(store: &EventStore, topic: &str, group: ActorGroup, responded: bool, depth: f64) {
        let mut event = NewEvent::new(topic, group).with_depth(depth);
        if responded {
            event = event.responded_in(10.0);
        }
        store.record(event).unwrap();
    }

    fn analyzer() -> DifferentialAnalyzer {
        DifferentialAnalyzer::new("acme", ThresholdClassifier::default())
    }

    #[test]
    fn test_relative_differential() {
        assert_eq!(relative_differential(0.0, 0.4), None);
        assert_eq!(relative_differential(2.0, 1.0), Some(0.5));
        assert_eq!(relative_differential(1.0, 3.0), Some(-2.0));
        assert_eq!(relative_differential(0.7, 0.7), Some(0.0));
    }

    #[test]
    fn test_zero_baseline_value_gives_null() {
        let store = EventStore::new();
        // Nothing attributed in baseline: attribution_rate baseline = 0.
        record(&store, "audit", ActorGroup::Baseline, true, 0.5);
        store
            .record(
                NewEvent::new("audit", ActorGroup::Test)
                    .responded_in(10.0)
                    .with_depth(0.5)
                    .attributed(true),
            )
            .unwrap();

        let analysis = analyzer().analyze(&store, &[]).unwrap();
        let attribution = analysis
            .results
            .iter()
            .find(|r| r.metric == Metric::AttributionRate)
            .unwrap();
        assert_eq!(attribution.differential, None);
        assert!(!attribution.exceeds_threshold);
        // Undefined differentials sort last.
        assert_eq!(analysis.results.last().unwrap().metric, Metric::AttributionRate);
    }

    #[test]
    fn test_skip_reasons() {
        let store = EventStore::new();
        record(&store, "only_test", ActorGroup::Test, true, 0.5);
        record(&store, "only_baseline", ActorGroup::Baseline, true, 0.5);

        let topics = vec![
            "only_test".to_string(),
            "only_baseline".to_string(),
            "ghost".to_string(),
        ];
        let analysis = analyzer().analyze(&store, &topics).unwrap();

        assert!(analysis.results.is_empty());
        let reasons: Vec<_> = analysis
            .skipped_topics
            .iter()
            .map(|s| (s.topic.as_str(), s.reason))
            .collect();
        assert_eq!(
            reasons,
            vec![
                ("ghost", SkipReason::NoEvents),
                ("only_baseline", SkipReason::NoTest),
                ("only_test", SkipReason::NoBaseline),
            ]
        );
        assert_eq!(
            analysis.empty_inputs(),
            vec![EmptyInputError {
                topic: "ghost".into()
            }]
        );
    }

    #[test]
    fn test_duplicate_requested_topics_analysed_once() {
        let store = EventStore::new();
        record(&store, "audit", ActorGroup::Baseline, true, 0.5);
        record(&store, "audit", ActorGroup::Test, true, 0.5);

        let topics = vec!["audit".to_string(), " audit".to_string()];
        let analysis = analyzer().analyze(&store, &topics).unwrap();
        assert_eq!(analysis.results.len(), Metric::ALL.len());
    }

    #[test]
    fn test_blank_requested_topic_rejected() {
        let store = EventStore::new();
        record(&store, "audit", ActorGroup::Baseline, true, 0.5);
        record(&store, "audit", ActorGroup::Test, true, 0.5);

        let topics = vec!["audit".to_string(), "  ".to_string()];
        assert!(matches!(
            analyzer().analyze(&store, &topics),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "topics"
        ));
    }

    #[test]
    fn test_ordering() {
        let store = EventStore::new();
        // "beta": depth 0.8 -> 0.2 (0.75). "alpha": depth 0.8 -> 0.4 (0.5).
        for (topic, test_depth) in [("beta", 0.2), ("alpha", 0.4)] {
            record(&store, topic, ActorGroup::Baseline, true, 0.8);
            record(&store, topic, ActorGroup::Test, true, test_depth);
        }

        let analysis = analyzer().analyze(&store, &[]).unwrap();
        let head: Vec<_> = analysis
            .results
            .iter()
            .take(2)
            .map(|r| (r.topic.as_str(), r.metric))
            .collect();
        assert_eq!(
            head,
            vec![
                ("beta", Metric::MeanResponseDepth),
                ("alpha", Metric::MeanResponseDepth)
            ]
        );

        // Remaining zero differentials tie on magnitude: topic then metric order.
        let tail: Vec<_> = analysis.results[2..6]
            .iter()
            .map(|r| (r.topic.as_str(), r.metric))
            .collect();
        assert_eq!(
            tail,
            vec![
                ("alpha", Metric::ResponseRate),
                ("alpha", Metric::MeanResponseTime),
                ("beta", Metric::ResponseRate),
                ("beta", Metric::MeanResponseTime),
            ]
        );
    }
}
