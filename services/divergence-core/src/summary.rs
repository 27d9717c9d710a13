//! Run-level summary of divergent results.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::aggregate::Metric;
use crate::analyzer::DifferentialResult;

/// Engagement pattern named after the metric that diverges most.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DivergencePattern {
    SelectiveNonResponse,
    DelayedEngagement,
    SuperficialEngagement,
    AttributionAvoidance,
}

impl DivergencePattern {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SelectiveNonResponse => "selective_non_response",
            Self::DelayedEngagement => "delayed_engagement",
            Self::SuperficialEngagement => "superficial_engagement",
            Self::AttributionAvoidance => "attribution_avoidance",
        }
    }
}

impl From<Metric> for DivergencePattern {
    fn from(metric: Metric) -> Self {
        match metric {
            Metric::ResponseRate => Self::SelectiveNonResponse,
            Metric::MeanResponseTime => Self::DelayedEngagement,
            Metric::MeanResponseDepth => Self::SuperficialEngagement,
            Metric::AttributionRate => Self::AttributionAvoidance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DivergenceSummary {
    pub divergence_detected: bool,
    pub divergent_topics: Vec<String>,
    /// Metric with the greatest mean |differential| among divergent results
    /// that show reduced engagement from the test group.
    pub dominant_metric: Option<Metric>,
    pub pattern: Option<DivergencePattern>,
    /// Mean |differential| over divergent results; 0 when there are none.
    pub strength: f64,
}

impl DivergenceSummary {
    pub fn from_results(results: &[DifferentialResult]) -> Self {
        let divergent: Vec<(&DifferentialResult, f64)> = results
            .iter()
            .filter(|r| r.exceeds_threshold)
            .filter_map(|r| r.magnitude().map(|m| (r, m)))
            .collect();

        let divergent_topics: Vec<String> = divergent
            .iter()
            .map(|(r, _)| r.topic.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let strength = if divergent.is_empty() {
            0.0
        } else {
            divergent.iter().map(|(_, m)| m).sum::<f64>() / divergent.len() as f64
        };

        // Strictly-greater keeps the earliest metric on ties.
        let mut dominant: Option<(Metric, f64)> = None;
        for metric in Metric::ALL {
            let magnitudes: Vec<f64> = divergent
                .iter()
                .filter(|(r, _)| r.metric == metric && reduces_engagement(r))
                .map(|(_, m)| *m)
                .collect();
            if magnitudes.is_empty() {
                continue;
            }
            let mean = magnitudes.iter().sum::<f64>() / magnitudes.len() as f64;
            if dominant.map_or(true, |(_, best)| mean > best) {
                dominant = Some((metric, mean));
            }
        }
        let dominant_metric = dominant.map(|(metric, _)| metric);

        Self {
            divergence_detected: !divergent.is_empty(),
            divergent_topics,
            dominant_metric,
            pattern: dominant_metric.map(DivergencePattern::from),
            strength,
        }
    }
}

/// Whether the test group engaged less than baseline on this result.
/// Response time is the one metric where a larger value means less engagement.
fn reduces_engagement(result: &DifferentialResult) -> bool {
    match (result.metric, result.differential) {
        (Metric::MeanResponseTime, Some(d)) => d < 0.0,
        (_, Some(d)) => d > 0.0,
        (_, None) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(topic: &str, metric: Metric, differential: f64, exceeds: bool) -> DifferentialResult {
        DifferentialResult {
            topic: topic.into(),
            metric,
            baseline_value: 1.0,
            test_value: 1.0 - differential,
            differential: Some(differential),
            exceeds_threshold: exceeds,
        }
    }

    #[test]
    fn test_no_divergence() {
        let summary = DivergenceSummary::from_results(&[result(
            "audit",
            Metric::ResponseRate,
            0.1,
            false,
        )]);
        assert!(!summary.divergence_detected);
        assert!(summary.divergent_topics.is_empty());
        assert_eq!(summary.pattern, None);
        assert_eq!(summary.strength, 0.0);
    }

    #[test]
    fn test_dominant_metric_and_strength() {
        let results = vec![
            result("audit", Metric::ResponseRate, 0.9, true),
            result("zoning", Metric::ResponseRate, 0.5, true),
            result("audit", Metric::MeanResponseDepth, -0.8, true),
            result("hiring", Metric::AttributionRate, 0.2, false),
        ];
        let summary = DivergenceSummary::from_results(&results);

        assert!(summary.divergence_detected);
        assert_eq!(summary.divergent_topics, vec!["audit", "zoning"]);
        // Test group answered deeper than baseline, so depth cannot name
        // the pattern even though its magnitude is the largest.
        assert_eq!(summary.dominant_metric, Some(Metric::ResponseRate));
        assert_eq!(summary.pattern, Some(DivergencePattern::SelectiveNonResponse));
        assert!((summary.strength - (0.9 + 0.5 + 0.8) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_tie_prefers_earlier_metric() {
        let results = vec![
            result("audit", Metric::AttributionRate, 0.6, true),
            result("audit", Metric::ResponseRate, 0.6, true),
        ];
        let summary = DivergenceSummary::from_results(&results);
        assert_eq!(summary.pattern, Some(DivergencePattern::SelectiveNonResponse));
    }

    #[test]
    fn test_increased_engagement_has_no_pattern() {
        let results = vec![
            result("audit", Metric::ResponseRate, -0.9, true),
            result("audit", Metric::MeanResponseTime, 0.7, true),
        ];
        let summary = DivergenceSummary::from_results(&results);

        assert!(summary.divergence_detected);
        assert_eq!(summary.divergent_topics, vec!["audit"]);
        assert_eq!(summary.dominant_metric, None);
        assert_eq!(summary.pattern, None);
        assert!((summary.strength - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_slower_responses_are_delayed_engagement() {
        let results = vec![
            result("audit", Metric::MeanResponseTime, -2.0, true),
            result("audit", Metric::AttributionRate, 0.6, true),
        ];
        let summary = DivergenceSummary::from_results(&results);
        assert_eq!(summary.dominant_metric, Some(Metric::MeanResponseTime));
        assert_eq!(summary.pattern, Some(DivergencePattern::DelayedEngagement));
    }
}
