#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate
)]

//! Command implementations for the `divergence` binary.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use divergence_common::{Config, Validate};
use divergence_core::{
    ingest_path, ActorGroup, DifferentialAnalyzer, EventStore, IngestSummary, ReportFormat,
    ReportGenerator, ThresholdClassifier,
};

/// Values given on the command line. They win over file and environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub subject: Option<String>,
    pub topics: Vec<String>,
    pub threshold: Option<f64>,
    pub format: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
}

impl Overrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(subject) = &self.subject {
            config.analysis.subject.clone_from(subject);
        }
        if !self.topics.is_empty() {
            config.analysis.topics.clone_from(&self.topics);
        }
        if let Some(threshold) = self.threshold {
            config.analysis.threshold = threshold;
        }
        if let Some(format) = &self.format {
            config.report.format.clone_from(format);
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level.clone_from(level);
        }
        if let Some(format) = &self.log_format {
            config.observability.log_format.clone_from(format);
        }
    }
}

/// Load file and environment configuration, apply flags, and validate.
///
/// Any configuration error is returned before input is touched.
pub fn resolve_config(path: Option<&Path>, overrides: &Overrides) -> Result<Config> {
    let mut config = Config::load_with_env(path).context("Failed to load configuration")?;
    overrides.apply(&mut config);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Ingest every input in the order given.
pub fn ingest_all(inputs: &[PathBuf], store: &EventStore) -> Result<Vec<IngestSummary>> {
    inputs
        .iter()
        .map(|path| {
            ingest_path(path, store).with_context(|| format!("Failed to ingest {}", path.display()))
        })
        .collect()
}

/// Run the full pipeline and return the rendered report.
///
/// When `output` is set the report is also written there.
pub fn run_analyze(config: &Config, inputs: &[PathBuf], output: Option<&Path>) -> Result<String> {
    let classifier = ThresholdClassifier::new(config.analysis.threshold)?;
    let format: ReportFormat = config
        .report
        .format
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let store = EventStore::new();
    let ingest = ingest_all(inputs, &store)?;

    let analyzer = DifferentialAnalyzer::new(config.analysis.subject.clone(), classifier);
    let analysis = analyzer.analyze(&store, &config.analysis.topics)?;
    for empty in analysis.empty_inputs() {
        tracing::warn!(%empty, "Requested topic has no data");
    }

    let generator = ReportGenerator::new(&analysis).with_ingest(&ingest);
    if let Some(path) = output {
        let written = generator.save_to_file(path, format)?;
        tracing::info!(path = %written.display(), "Report saved");
    }

    Ok(generator.generate(format))
}

/// Per-topic event counts and the skipped-record tally.
pub fn run_inspect(inputs: &[PathBuf]) -> Result<String> {
    let store = EventStore::new();
    let ingest = ingest_all(inputs, &store)?;
    let snapshot = store.snapshot();

    let mut counts: BTreeMap<&str, [usize; 2]> = BTreeMap::new();
    for event in snapshot.iter() {
        let slot = match event.actor_group {
            ActorGroup::Baseline => 0,
            ActorGroup::Test => 1,
        };
        counts.entry(event.topic.as_str()).or_default()[slot] += 1;
    }

    let width = counts.keys().map(|t| t.chars().count()).max().unwrap_or(0).max("TOPIC".len());
    let mut out = String::new();
    let _ = writeln!(out, "{:<width$}  {:>8}  {:>8}", "TOPIC", "BASELINE", "TEST");
    for (topic, [baseline, test]) in &counts {
        let _ = writeln!(out, "{topic:<width$}  {baseline:>8}  {test:>8}");
    }

    let recorded: usize = ingest.iter().map(|s| s.recorded).sum();
    let skipped: usize = ingest.iter().map(IngestSummary::skipped_count).sum();
    let _ = writeln!(out, "\nEvents: {recorded}  Skipped records: {skipped}");
    for record in ingest.iter().flat_map(|s| &s.skipped) {
        let _ = writeln!(out, "  {}:{}  {}", record.source, record.line, record.reason);
    }

    Ok(out)
}
