//! JSON Lines ingestion.
//!
//! One [`NewEvent`] object per line. A bad line is skipped and counted;
//! only I/O failure of the reader stops ingestion.

use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Result, ValidationError};
use crate::event::NewEvent;
use crate::store::EventStore;

/// A record that was not stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecord {
    pub source: String,
    /// 1-based line number
    pub line: usize,
    pub reason: String,
}

/// Outcome of ingesting one source.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestSummary {
    pub source: String,
    pub recorded: usize,
    pub skipped: Vec<SkippedRecord>,
}

impl IngestSummary {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// Ingest every line of `reader` into `store`.
pub fn ingest_reader<R: BufRead>(
    reader: R,
    source: &str,
    store: &EventStore,
) -> Result<IngestSummary> {
    let mut summary = IngestSummary {
        source: source.to_string(),
        ..IngestSummary::default()
    };

    // Split on raw bytes: a line that is not UTF-8 is a bad record, not a
    // read failure.
    for (index, bytes) in reader.split(b'\n').enumerate() {
        let bytes = bytes?;
        let number = index + 1;

        let outcome = String::from_utf8(bytes)
            .map_err(|e| ValidationError::Malformed {
                line: number,
                reason: e.to_string(),
            })
            .and_then(|line| {
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    return Ok(None);
                }
                let event = serde_json::from_str::<NewEvent>(trimmed).map_err(|e| {
                    ValidationError::Malformed {
                        line: number,
                        reason: e.to_string(),
                    }
                })?;
                store.record(event).map(Some)
            });

        match outcome {
            Ok(None) => {}
            Ok(Some(_)) => summary.recorded += 1,
            Err(error) => {
                tracing::warn!(source, line = number, %error, "Skipping invalid record");
                summary.skipped.push(SkippedRecord {
                    source: source.to_string(),
                    line: number,
                    reason: error.to_string(),
                });
            }
        }
    }

    tracing::info!(
        source,
        recorded = summary.recorded,
        skipped = summary.skipped_count(),
        "Ingested events"
    );

    Ok(summary)
}

/// Ingest a JSON Lines file.
pub fn ingest_path(path: &Path, store: &EventStore) -> Result<IngestSummary> {
    let file = File::open(path)?;
    ingest_reader(BufReader::new(file), &path.display().to_string(), store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ActorGroup;
    use std::io::Cursor;

    const GOOD: &str = r#"{"topic":"audit","actor_group":"baseline","response_time_secs":2.0,"response_depth":0.9,"attributed":true,"timestamp":"2024-03-01T12:00:00Z"}"#;

    #[test]
    fn test_bad_lines_skipped_rest_continue() {
        let input = format!(
            "{GOOD}\n\
             not json at all\n\
             \n\
             # comment\n\
             {{\"topic\":\"audit\",\"actor_group\":\"test\",\"response_depth\":1.7,\"timestamp\":\"2024-03-01T12:00:00Z\"}}\n\
             {{\"topic\":\"audit\",\"actor_group\":\"test\",\"response_depth\":0.2,\"timestamp\":\"2024-03-02T12:00:00Z\"}}\n"
        );

        let store = EventStore::new();
        let summary = ingest_reader(Cursor::new(input), "inline", &store).unwrap();

        assert_eq!(summary.recorded, 2);
        assert_eq!(summary.skipped_count(), 2);
        assert_eq!(summary.skipped[0].line, 2);
        assert_eq!(summary.skipped[1].line, 5);
        assert!(summary.skipped[1].reason.contains("response_depth"));

        let test_events: Vec<_> = store.query(Some("audit"), Some(ActorGroup::Test)).collect();
        assert_eq!(test_events.len(), 1);
        assert!(!test_events[0].responded());
    }

    #[test]
    fn test_non_utf8_line_skipped() {
        let mut input = Vec::new();
        input.extend_from_slice(GOOD.as_bytes());
        input.extend_from_slice(b"\n{\"topic\":\"au\xffdit\"}\n");
        input.extend_from_slice(GOOD.as_bytes());
        input.push(b'\n');

        let store = EventStore::new();
        let summary = ingest_reader(Cursor::new(input), "inline", &store).unwrap();

        assert_eq!(summary.recorded, 2);
        assert_eq!(summary.skipped_count(), 1);
        assert_eq!(summary.skipped[0].line, 2);
        assert!(summary.skipped[0].reason.contains("malformed"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_crlf_lines_accepted() {
        let input = format!("{GOOD}\r\n{GOOD}\r\n");
        let store = EventStore::new();
        let summary = ingest_reader(Cursor::new(input), "inline", &store).unwrap();
        assert_eq!(summary.recorded, 2);
        assert!(summary.skipped.is_empty());
    }

    #[test]
    fn test_unknown_field_is_malformed() {
        let line = r#"{"topic":"audit","actor_group":"test","response_depth":0.2,"timestamp":"2024-03-02T12:00:00Z","mood":"grim"}"#;
        let store = EventStore::new();
        let summary = ingest_reader(Cursor::new(line), "inline", &store).unwrap();
        assert_eq!(summary.recorded, 0);
        assert!(summary.skipped[0].reason.contains("malformed"));
    }

    #[test]
    fn test_ingest_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        std::fs::write(&path, format!("{GOOD}\n{GOOD}\n")).unwrap();

        let store = EventStore::new();
        let summary = ingest_path(&path, &store).unwrap();
        assert_eq!(summary.recorded, 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let store = EventStore::new();
        let err = ingest_path(Path::new("/definitely/not/here.jsonl"), &store).unwrap_err();
        assert!(err.is_fatal());
    }
}
