//! Ingestion pipeline
//!
//! ```text
//! bytes ──▶ LineReader ──▶ parse_line ──▶ Vec<RawRecord> ──▶ sort (newest first) ──▶ classify
//!                              │                                                      │
//!                         skipped lines                                       Vec<LogEntry>
//! ```
//!
//! One call is one run: every result is freshly allocated and owned by the
//! caller. Any error aborts the run and nothing partial is returned. The
//! moving-average engine is not part of ingestion; callers run it on demand.

use crate::acquisition::{parse_line, LineReader};
use crate::classifier::classify;
use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::types::{EntryKind, LogEntry, RawRecord};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::path::Path;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Source label logged for readers that are not files.
const STREAM_SOURCE: &str = "stream";

/// Result of one ingestion run.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingested {
    /// Classified events, newest first
    pub entries: Vec<LogEntry>,
    /// Every data row, newest first
    pub records: Vec<RawRecord>,
    pub stats: IngestStats,
}

impl Ingested {
    /// Split into `(entries, records)`.
    pub fn into_parts(self) -> (Vec<LogEntry>, Vec<RawRecord>) {
        (self.entries, self.records)
    }
}

/// Counters for one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub lines_read: usize,
    /// Header, metadata and blank lines
    pub skipped_lines: usize,
    pub records: usize,
    pub sensor_entries: usize,
    pub bolus_entries: usize,
    pub measured_entries: usize,
    /// Earliest valid record timestamp
    pub first_timestamp: Option<NaiveDateTime>,
    /// Latest valid record timestamp
    pub last_timestamp: Option<NaiveDateTime>,
}

impl IngestStats {
    pub const fn entries(&self) -> usize {
        self.sensor_entries + self.bolus_entries + self.measured_entries
    }

    fn count_entries(&mut self, entries: &[LogEntry]) {
        for entry in entries {
            match entry.kind() {
                EntryKind::SensorBg => self.sensor_entries += 1,
                EntryKind::Bolus => self.bolus_entries += 1,
                EntryKind::MeasuredBg => self.measured_entries += 1,
            }
        }
    }
}

/// Ingest an export from any async byte source.
pub async fn ingest<R>(source: R, config: &IngestConfig) -> Result<Ingested, IngestError>
where
    R: AsyncRead + Unpin,
{
    let reader = LineReader::new(source).with_chunk_size(config.chunk_size);
    run(reader, STREAM_SOURCE, config).await
}

/// Like [`ingest`], but stops with [`IngestError::Cancelled`] at the next
/// chunk read once `token` is cancelled.
pub async fn ingest_cancellable<R>(
    source: R,
    config: &IngestConfig,
    token: CancellationToken,
) -> Result<Ingested, IngestError>
where
    R: AsyncRead + Unpin,
{
    let reader = LineReader::new(source)
        .with_chunk_size(config.chunk_size)
        .with_cancellation(token);
    run(reader, STREAM_SOURCE, config).await
}

/// Open `path` and ingest it.
pub async fn ingest_file(path: impl AsRef<Path>, config: &IngestConfig) -> Result<Ingested, IngestError> {
    let path = path.as_ref();
    let file = tokio::fs::File::open(path).await?;
    let reader = LineReader::new(file).with_chunk_size(config.chunk_size);
    run(reader, &path.display().to_string(), config).await
}

async fn run<R>(
    mut reader: LineReader<R>,
    source_name: &str,
    config: &IngestConfig,
) -> Result<Ingested, IngestError>
where
    R: AsyncRead + Unpin,
{
    info!(
        source = %source_name,
        chunk_size = config.chunk_size,
        numeric_policy = ?config.numeric_policy,
        "Starting ingestion"
    );

    let mut stats = IngestStats::default();
    let mut records = Vec::new();

    while let Some(line) = reader.next_line().await? {
        let line_number = reader.lines_read();
        match parse_line(&line).map_err(|source| IngestError::Parse { line: line_number, source })? {
            Some(record) => records.push(record),
            None => {
                stats.skipped_lines += 1;
                debug!(line = line_number, "Skipping non-record line");
            }
        }
    }
    stats.lines_read = reader.lines_read();
    stats.records = records.len();

    // Stable, so rows sharing a timestamp keep file order.
    records.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));

    let valid = records.iter().filter_map(|r| r.timestamp().get());
    stats.first_timestamp = valid.clone().min();
    stats.last_timestamp = valid.max();

    let entries = classify(&records, config.numeric_policy)?;
    stats.count_entries(&entries);

    info!(
        lines = stats.lines_read,
        records = stats.records,
        skipped = stats.skipped_lines,
        sensor = stats.sensor_entries,
        bolus = stats.bolus_entries,
        measured = stats.measured_entries,
        "Ingestion complete"
    );

    Ok(Ingested { entries, records, stats })
}
