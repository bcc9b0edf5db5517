// WHY: reader for the mining oracle's structured output
// Drain writes CSV; JSON Lines is accepted for miners that emit one object per line

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// One log line as labelled by the mining oracle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinedRecord {
    #[serde(rename = "LineId", alias = "line_id", default)]
    pub line_id: Option<u64>,
    #[serde(rename = "Content", alias = "content")]
    pub content: String,
    #[serde(rename = "EventId", alias = "event_id")]
    pub event_id: String,
    #[serde(rename = "EventTemplate", alias = "event_template")]
    pub event_template: String,
}

/// On-disk layout of mined records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    Csv,
    JsonLines,
}

impl RecordFormat {
    /// `.jsonl`, `.ndjson` and `.json` are JSON Lines, anything else is CSV
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("jsonl") | Some("ndjson") | Some("json") => Self::JsonLines,
            _ => Self::Csv,
        }
    }
}

/// Configuration for mined record reading
#[derive(Debug, Clone, Default)]
pub struct MinedReaderConfig {
    /// Abort on the first malformed record instead of skipping it
    pub fail_fast: bool,
    /// Override extension-based format detection
    pub format: Option<RecordFormat>,
}

/// Statistics for one structured-file read
#[derive(Debug, Clone, Default)]
pub struct MinedReadStats {
    pub file_path: String,
    pub records_read: u64,
    pub records_skipped: u64,
    pub duration_ms: u64,
}

/// Reads the oracle's structured output into memory
pub struct MinedRecordReader {
    config: MinedReaderConfig,
}

impl MinedRecordReader {
    pub fn new(config: MinedReaderConfig) -> Self {
        Self { config }
    }

    pub async fn read_records<P: AsRef<Path>>(
        &self,
        file_path: P,
    ) -> Result<(Vec<MinedRecord>, MinedReadStats)> {
        let path = file_path.as_ref();
        let start_time = std::time::Instant::now();
        let format = self
            .config
            .format
            .unwrap_or_else(|| RecordFormat::from_path(path));

        debug!("Reading mined records from {} as {:?}", path.display(), format);

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read structured file {}", path.display()))?;

        let mut stats = MinedReadStats {
            file_path: path.display().to_string(),
            ..Default::default()
        };

        let records = match format {
            RecordFormat::Csv => self.parse_csv(&bytes, &mut stats)?,
            RecordFormat::JsonLines => self.parse_json_lines(&bytes, &mut stats)?,
        };

        stats.duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Read {} mined records from {} ({} skipped) in {}ms",
            stats.records_read, stats.file_path, stats.records_skipped, stats.duration_ms
        );

        Ok((records, stats))
    }

    fn parse_csv(&self, bytes: &[u8], stats: &mut MinedReadStats) -> Result<Vec<MinedRecord>> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
        let mut records = Vec::new();

        for (row, result) in reader.deserialize::<MinedRecord>().enumerate() {
            match result {
                Ok(record) => {
                    stats.records_read += 1;
                    records.push(record);
                }
                // header is line 1, so data row `row` sits on line row + 2
                Err(e) => self.skip_or_fail(stats, row + 2, &e)?,
            }
        }

        Ok(records)
    }

    fn parse_json_lines(&self, bytes: &[u8], stats: &mut MinedReadStats) -> Result<Vec<MinedRecord>> {
        let text = std::str::from_utf8(bytes).context("JSON Lines input is not valid UTF-8")?;
        let mut records = Vec::new();

        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<MinedRecord>(line) {
                Ok(record) => {
                    stats.records_read += 1;
                    records.push(record);
                }
                Err(e) => self.skip_or_fail(stats, index + 1, &e)?,
            }
        }

        Ok(records)
    }

    fn skip_or_fail(
        &self,
        stats: &mut MinedReadStats,
        line: usize,
        error: &dyn std::fmt::Display,
    ) -> Result<()> {
        let error_msg = format!("Malformed record in {} at line {}: {}", stats.file_path, line, error);
        if self.config.fail_fast {
            anyhow::bail!(error_msg);
        }
        warn!("{}", error_msg);
        stats.records_skipped += 1;
        Ok(())
    }
}

/// Convenience function for reading a structured file with default configuration
pub async fn read_mined_records<P: AsRef<Path>>(file_path: P) -> Result<Vec<MinedRecord>> {
    let reader = MinedRecordReader::new(MinedReaderConfig::default());
    let (records, _stats) = reader.read_records(file_path).await?;
    Ok(records)
}
