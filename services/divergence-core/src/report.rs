//! Report rendering for analysis results.
//!
//! Generates reports in various formats:
//! - Table (fixed-width text for terminals)
//! - Markdown (for documentation)
//! - JSON (for downstream tooling)
//!
//! Rendering is pure formatting over an [`Analysis`]. Nothing time- or
//! run-dependent is written, so the same input renders byte-identically.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::aggregate::Metric;
use crate::analyzer::{Analysis, DifferentialResult, SkippedTopic};
use crate::classifier::Classification;
use crate::ingest::{IngestSummary, SkippedRecord};
use crate::summary::DivergenceSummary;

// ============================================================================
// Report Format
// ============================================================================

/// Supported report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    /// Fixed-width text table (human-readable)
    Table,
    /// Markdown format (documentation)
    Markdown,
    /// JSON format (machine-readable)
    Json,
}

impl ReportFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Table => "txt",
            Self::Markdown => "md",
            Self::Json => "json",
        }
    }
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Markdown => write!(f, "markdown"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "text" => Ok(Self::Table),
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown report format: {}", s)),
        }
    }
}

// ============================================================================
// Machine-readable document
// ============================================================================

/// One row of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord<'a> {
    pub topic: &'a str,
    pub metric: Metric,
    pub baseline_value: f64,
    pub test_value: f64,
    pub differential: Option<f64>,
    pub classification: Classification,
}

impl<'a> From<&'a DifferentialResult> for ResultRecord<'a> {
    fn from(result: &'a DifferentialResult) -> Self {
        Self {
            topic: &result.topic,
            metric: result.metric,
            baseline_value: result.baseline_value,
            test_value: result.test_value,
            differential: result.differential,
            classification: result.classification(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ReportDocument<'a> {
    subject: &'a str,
    threshold: f64,
    event_count: usize,
    results: Vec<ResultRecord<'a>>,
    skipped_topics: &'a [SkippedTopic],
    skipped_records: Vec<&'a SkippedRecord>,
    summary: &'a DivergenceSummary,
}

// ============================================================================
// Report Generator
// ============================================================================

/// Renders an [`Analysis`] and the ingestion tallies that fed it.
pub struct ReportGenerator<'a> {
    analysis: &'a Analysis,
    ingest: &'a [IngestSummary],
    summary: DivergenceSummary,
}

impl<'a> ReportGenerator<'a> {
    pub fn new(analysis: &'a Analysis) -> Self {
        Self {
            analysis,
            ingest: &[],
            summary: DivergenceSummary::from_results(&analysis.results),
        }
    }

    /// Include skipped-record tallies from ingestion.
    pub fn with_ingest(mut self, ingest: &'a [IngestSummary]) -> Self {
        self.ingest = ingest;
        self
    }

    pub fn summary(&self) -> &DivergenceSummary {
        &self.summary
    }

    fn skipped_records(&self) -> Vec<&'a SkippedRecord> {
        self.ingest.iter().flat_map(|s| s.skipped.iter()).collect()
    }

    /// Generate report in the specified format.
    pub fn generate(&self, format: ReportFormat) -> String {
        match format {
            ReportFormat::Table => self.to_table(),
            ReportFormat::Markdown => self.to_markdown(),
            ReportFormat::Json => self.to_json(),
        }
    }

    /// Save report to file, adding the format's extension if `path` has none.
    pub fn save_to_file(&self, path: &Path, format: ReportFormat) -> Result<PathBuf> {
        let content = self.generate(format);

        let file_path = if path.extension().is_none() {
            path.with_extension(format.extension())
        } else {
            path.to_path_buf()
        };

        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).context("Failed to create report directory")?;
            }
        }

        std::fs::write(&file_path, content)
            .with_context(|| format!("Failed to write report to {}", file_path.display()))?;

        Ok(file_path)
    }

    /// Generate fixed-width text table.
    pub fn to_table(&self) -> String {
        let analysis = self.analysis;
        let mut out = String::new();

        let _ = writeln!(out, "Differential response report: {}", analysis.subject);
        let _ = writeln!(out, "Threshold: {:.3}", analysis.threshold);
        let _ = writeln!(out, "Events analysed: {}", analysis.event_count);
        out.push('\n');

        let topic_width = analysis
            .results
            .iter()
            .map(|r| r.topic.chars().count())
            .max()
            .unwrap_or(0)
            .max("TOPIC".len());

        if analysis.results.is_empty() {
            out.push_str("No comparable topics.\n");
        } else {
            let _ = writeln!(
                out,
                "{:<tw$}  {:<19}  {:>10}  {:>10}  {:>12}  {}",
                "TOPIC",
                "METRIC",
                "BASELINE",
                "TEST",
                "DIFFERENTIAL",
                "CLASSIFICATION",
                tw = topic_width
            );
            for r in &analysis.results {
                let _ = writeln!(
                    out,
                    "{:<tw$}  {:<19}  {:>10.3}  {:>10.3}  {:>12}  {}",
                    r.topic,
                    r.metric.as_str(),
                    r.baseline_value,
                    r.test_value,
                    format_differential(r.differential),
                    r.classification(),
                    tw = topic_width
                );
            }
        }

        if !analysis.skipped_topics.is_empty() {
            out.push_str("\nSkipped topics:\n");
            for s in &analysis.skipped_topics {
                let _ = writeln!(
                    out,
                    "  {}  {} (baseline {}, test {})",
                    s.topic,
                    s.reason.as_str(),
                    s.baseline_events,
                    s.test_events
                );
            }
        }

        let skipped = self.skipped_records();
        let _ = writeln!(out, "\nSkipped records: {}", skipped.len());
        for record in &skipped {
            let _ = writeln!(out, "  {}:{}  {}", record.source, record.line, record.reason);
        }

        out.push_str("\nSummary:\n");
        let _ = writeln!(
            out,
            "  divergence detected: {}",
            if self.summary.divergence_detected { "yes" } else { "no" }
        );
        if self.summary.divergence_detected {
            let _ = writeln!(
                out,
                "  divergent topics: {}",
                self.summary.divergent_topics.join(", ")
            );
        }
        if let (Some(pattern), Some(metric)) = (self.summary.pattern, self.summary.dominant_metric) {
            let _ = writeln!(out, "  pattern: {} ({})", pattern.as_str(), metric);
        }
        let _ = writeln!(out, "  strength: {:.3}", self.summary.strength);

        out
    }

    /// Generate markdown report.
    pub fn to_markdown(&self) -> String {
        let analysis = self.analysis;
        let mut md = String::new();

        let _ = write!(
            md,
            "# Differential Response Report: {}\n\n- **Threshold**: {:.3}\n- **Events analysed**: {}\n- **Skipped records**: {}\n\n",
            analysis.subject,
            analysis.threshold,
            analysis.event_count,
            self.skipped_records().len()
        );

        md.push_str("## Results\n\n");
        if analysis.results.is_empty() {
            md.push_str("No comparable topics.\n\n");
        } else {
            md.push_str("| Topic | Metric | Baseline | Test | Differential | Classification |\n");
            md.push_str("|-------|--------|----------|------|--------------|----------------|\n");
            for r in &analysis.results {
                let _ = writeln!(
                    md,
                    "| {} | {} | {:.3} | {:.3} | {} | {} |",
                    r.topic,
                    r.metric,
                    r.baseline_value,
                    r.test_value,
                    format_differential(r.differential),
                    r.classification()
                );
            }
            md.push('\n');
        }

        if !analysis.skipped_topics.is_empty() {
            md.push_str("## Skipped Topics\n\n");
            md.push_str("| Topic | Reason | Baseline events | Test events |\n");
            md.push_str("|-------|--------|-----------------|-------------|\n");
            for s in &analysis.skipped_topics {
                let _ = writeln!(
                    md,
                    "| {} | {} | {} | {} |",
                    s.topic,
                    s.reason.as_str(),
                    s.baseline_events,
                    s.test_events
                );
            }
            md.push('\n');
        }

        md.push_str("## Summary\n\n");
        let _ = writeln!(
            md,
            "- **Divergence detected**: {}",
            if self.summary.divergence_detected { "yes" } else { "no" }
        );
        if self.summary.divergence_detected {
            let _ = writeln!(
                md,
                "- **Divergent topics**: {}",
                self.summary.divergent_topics.join(", ")
            );
        }
        if let Some(pattern) = self.summary.pattern {
            let _ = writeln!(md, "- **Pattern**: {}", pattern.as_str());
        }
        let _ = writeln!(md, "- **Strength**: {:.3}", self.summary.strength);

        md
    }

    /// Generate JSON report.
    pub fn to_json(&self) -> String {
        let document = ReportDocument {
            subject: &self.analysis.subject,
            threshold: self.analysis.threshold,
            event_count: self.analysis.event_count,
            results: self.analysis.results.iter().map(ResultRecord::from).collect(),
            skipped_topics: &self.analysis.skipped_topics,
            skipped_records: self.skipped_records(),
            summary: &self.summary,
        };
        serde_json::to_string_pretty(&document).unwrap_or_else(|_| "{}".to_string())
    }
}

fn format_differential(differential: Option<f64>) -> String {
    differential.map_or_else(|| "null".to_string(), |d| format!("{:.3}", d))
}
