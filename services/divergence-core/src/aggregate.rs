//! Per-topic engagement metrics.

use serde::{Deserialize, Serialize};

use crate::event::Event;

/// An engagement metric compared between groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    ResponseRate,
    MeanResponseTime,
    MeanResponseDepth,
    AttributionRate,
}

impl Metric {
    /// Every metric, in report order.
    pub const ALL: [Metric; 4] = [
        Metric::ResponseRate,
        Metric::MeanResponseTime,
        Metric::MeanResponseDepth,
        Metric::AttributionRate,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ResponseRate => "response_rate",
            Self::MeanResponseTime => "mean_response_time",
            Self::MeanResponseDepth => "mean_response_depth",
            Self::AttributionRate => "attribution_rate",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metrics for one topic within one actor group.
///
/// Derived on demand from a snapshot and never cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicAggregate {
    pub topic: String,
    pub event_count: usize,
    pub responded_count: usize,
    /// Fraction of events that received a response.
    pub response_rate: f64,
    /// Mean seconds to respond, over responded events; 0 when none responded.
    pub mean_response_time: f64,
    /// Mean depth over all events.
    pub mean_response_depth: f64,
    pub attribution_rate: f64,
}

impl TopicAggregate {
    /// Aggregate `events`, or `None` if there are none.
    pub fn from_events<'a, I>(topic: &str, events: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Event>,
    {
        let mut event_count = 0usize;
        let mut responded_count = 0usize;
        let mut attributed_count = 0usize;
        let mut total_time = 0.0;
        let mut total_depth = 0.0;

        for event in events {
            event_count += 1;
            total_depth += event.response_depth;
            if event.attributed {
                attributed_count += 1;
            }
            if let Some(secs) = event.response_time_secs() {
                responded_count += 1;
                total_time += secs;
            }
        }

        if event_count == 0 {
            return None;
        }

        let n = event_count as f64;
        Some(Self {
            topic: topic.to_string(),
            event_count,
            responded_count,
            response_rate: responded_count as f64 / n,
            mean_response_time: if responded_count == 0 {
                0.0
            } else {
                total_time / responded_count as f64
            },
            mean_response_depth: total_depth / n,
            attribution_rate: attributed_count as f64 / n,
        })
    }

    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::ResponseRate => self.response_rate,
            Metric::MeanResponseTime => self.mean_response_time,
            Metric::MeanResponseDepth => self.mean_response_depth,
            Metric::AttributionRate => self.attribution_rate,
        }
    }
}
