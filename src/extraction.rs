// WHY: batch driver - aligns every mined record and writes the extraction report
// Records are split into contiguous chunks so output order never depends on parallelism

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{info, warn};

use crate::aligner::{align, AlignError, AlignMode, MarkerSet, WildcardAligner};
use crate::grouping::write_event_groups;
use crate::mined::{MinedReaderConfig, MinedRecord, MinedRecordReader};

/// Directory under the output directory holding the extraction report
pub const EXTRACTION_DIR_NAME: &str = "ExtractionOutput";
/// File name of the extraction report
pub const EXTRACTED_CONTENTS_FILE_NAME: &str = "ExtractedContents.txt";

/// Configuration for a batch extraction run
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub markers: MarkerSet,
    pub mode: AlignMode,
    /// Abort on the first strict-mode failure or malformed record
    pub fail_fast: bool,
    /// Number of chunks aligned concurrently
    pub jobs: usize,
    pub show_progress: bool,
    /// Replace an existing extraction report
    pub overwrite: bool,
    /// Write `ExtractedContents.txt`
    pub extract_wildcards: bool,
    /// Write one `<event_id>.csv` per event group
    pub export_groups: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            markers: MarkerSet::default(),
            mode: AlignMode::Permissive,
            fail_fast: false,
            jobs: num_cpus::get().max(1),
            show_progress: false,
            overwrite: false,
            extract_wildcards: true,
            export_groups: true,
        }
    }
}

/// Aligned output for a single record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    /// `TemplateID: <event_id>, <pairs>`
    pub line: String,
    pub occurrences: usize,
    /// Strict-mode failure; `line` then holds the permissive result
    pub strict_error: Option<AlignError>,
}

/// Run-level statistics written with `--stats-out`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RunStats {
    /// Seconds since the Unix epoch when the run started
    pub run_start: u64,
    pub total_processing_time_ms: u64,
    pub records_processed: u64,
    pub records_skipped: u64,
    pub records_with_markers: u64,
    pub occurrences_extracted: u64,
    pub strict_failures: u64,
    pub groups_exported: u64,
    pub records_per_sec: f64,
    /// Extraction report path, absent when extraction was disabled
    pub extracted_contents: Option<String>,
}

/// `<output_dir>/ExtractionOutput/ExtractedContents.txt`
pub fn extracted_contents_path(output_dir: &Path) -> PathBuf {
    output_dir
        .join(EXTRACTION_DIR_NAME)
        .join(EXTRACTED_CONTENTS_FILE_NAME)
}

/// Align one record, falling back to the permissive result on strict failure
pub fn extract_record(aligner: &WildcardAligner, record: &MinedRecord) -> RecordOutcome {
    let (rendered, occurrences, strict_error) =
        match aligner.align(&record.event_template, &record.content) {
            Ok(alignment) => (alignment.to_string(), alignment.pairs.len(), None),
            Err(e) => {
                let alignment = align(&record.event_template, &record.content, aligner.markers());
                (alignment.to_string(), alignment.pairs.len(), Some(e))
            }
        };

    RecordOutcome {
        line: format!("TemplateID: {}, {}", record.event_id, rendered),
        occurrences,
        strict_error,
    }
}

/// Align all records, returning outcomes in record order
pub async fn extract_records(
    records: Arc<Vec<MinedRecord>>,
    config: &ExtractConfig,
) -> Result<Vec<RecordOutcome>> {
    let total = records.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let jobs = config.jobs.max(1);
    let chunk_size = total.div_ceil(jobs);
    let aligner = Arc::new(WildcardAligner::new(config.markers.clone(), config.mode));
    let progress = progress_bar(total as u64, config.show_progress);

    let tasks = (0..total).step_by(chunk_size).map(|chunk_start| {
        let records = Arc::clone(&records);
        let aligner = Arc::clone(&aligner);
        let progress = progress.clone();
        let chunk_end = (chunk_start + chunk_size).min(total);

        tokio::task::spawn_blocking(move || {
            records[chunk_start..chunk_end]
                .iter()
                .map(|record| {
                    let outcome = extract_record(&aligner, record);
                    progress.inc(1);
                    outcome
                })
                .collect::<Vec<_>>()
        })
    });

    let chunks = futures::future::try_join_all(tasks)
        .await
        .context("Alignment task panicked")?;
    progress.finish_and_clear();

    let outcomes: Vec<RecordOutcome> = chunks.into_iter().flatten().collect();

    for (index, outcome) in outcomes.iter().enumerate() {
        if let Some(ref error) = outcome.strict_error {
            let event_id = &records[index].event_id;
            if config.fail_fast {
                anyhow::bail!("Strict alignment failed for record {} (event {}): {}", index, event_id, error);
            }
            warn!("Strict alignment failed for record {} (event {}): {}", index, event_id, error);
        }
    }

    Ok(outcomes)
}

fn progress_bar(len: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} records") {
        bar.set_style(style);
    }
    bar
}

/// Write outcomes, one per line, to the extraction report
pub async fn write_extracted_contents(path: &Path, outcomes: &[RecordOutcome]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    for outcome in outcomes {
        writer.write_all(outcome.line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }

    writer.flush().await?;
    Ok(())
}

/// Write run statistics as pretty JSON
pub async fn write_stats(path: &Path, stats: &RunStats) -> Result<()> {
    let content = serde_json::to_string_pretty(stats)?;
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write stats file {}", path.display()))?;
    Ok(())
}

/// Read the miner's structured output, extract wildcards and export event groups
pub async fn run_extraction(
    structured_path: &Path,
    output_dir: &Path,
    config: &ExtractConfig,
) -> Result<RunStats> {
    let run_start = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let start_time = std::time::Instant::now();

    let report_path = extracted_contents_path(output_dir);
    if config.extract_wildcards && !config.overwrite && tokio::fs::try_exists(&report_path).await? {
        anyhow::bail!(
            "Extraction report already exists: {} (use --overwrite to replace it)",
            report_path.display()
        );
    }

    let reader = MinedRecordReader::new(MinedReaderConfig {
        fail_fast: config.fail_fast,
        format: None,
    });
    let (records, read_stats) = reader.read_records(structured_path).await?;
    let records = Arc::new(records);

    let mut stats = RunStats {
        run_start,
        records_processed: records.len() as u64,
        records_skipped: read_stats.records_skipped,
        ..Default::default()
    };

    if config.extract_wildcards {
        info!("Extracting wildcards from {} records", records.len());
        let outcomes = extract_records(Arc::clone(&records), config).await?;

        stats.records_with_markers = outcomes.iter().filter(|o| o.occurrences > 0).count() as u64;
        stats.occurrences_extracted = outcomes.iter().map(|o| o.occurrences as u64).sum();
        stats.strict_failures = outcomes.iter().filter(|o| o.strict_error.is_some()).count() as u64;

        write_extracted_contents(&report_path, &outcomes).await?;
        stats.extracted_contents = Some(report_path.display().to_string());
        info!("Wrote extraction report to {}", report_path.display());
    }

    if config.export_groups {
        let export = write_event_groups(output_dir, &records).await?;
        stats.groups_exported = export.groups_written as u64;
    }

    stats.total_processing_time_ms = start_time.elapsed().as_millis() as u64;
    stats.records_per_sec = if stats.total_processing_time_ms > 0 {
        stats.records_processed as f64 / (stats.total_processing_time_ms as f64 / 1000.0)
    } else {
        0.0
    };

    info!(
        "Extraction completed: {} records, {} occurrences, {} strict failures in {}ms",
        stats.records_processed,
        stats.occurrences_extracted,
        stats.strict_failures,
        stats.total_processing_time_ms
    );

    Ok(stats)
}
