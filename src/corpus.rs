use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Name of the assembled corpus written into the input directory
pub const CORPUS_FILE_NAME: &str = "concatenated_log_file.txt";

/// Bytes rewritten to spaces before the corpus reaches the miner
pub const DEFAULT_SEPARATORS: &[u8] = b"/\\()[].";

/// Configuration for corpus assembly
#[derive(Debug, Clone)]
pub struct CorpusConfig {
    /// Whether to fail fast on first error or continue processing
    pub fail_fast: bool,
    /// Buffer size for decompression and writing (default: 64KB)
    pub buffer_size: usize,
    /// Bytes replaced by a space in every decompressed line
    pub separators: Vec<u8>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            buffer_size: 64 * 1024,
            separators: DEFAULT_SEPARATORS.to_vec(),
        }
    }
}

/// Statistics for one shard appended to the corpus
#[derive(Debug, Clone)]
pub struct ShardStats {
    pub shard_path: String,
    pub compressed_bytes: u64,
    pub bytes_written: u64,
    pub lines_written: u64,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Outcome of assembling a corpus
#[derive(Debug, Clone)]
pub struct AssemblyReport {
    pub corpus_path: PathBuf,
    pub shards: Vec<ShardStats>,
}

impl AssemblyReport {
    pub fn total_lines(&self) -> u64 {
        self.shards.iter().map(|s| s.lines_written).sum()
    }

    pub fn total_bytes(&self) -> u64 {
        self.shards.iter().map(|s| s.bytes_written).sum()
    }

    pub fn failed_shards(&self) -> usize {
        self.shards.iter().filter(|s| s.error.is_some()).count()
    }
}

/// Path of the corpus file for a given input directory
pub fn corpus_path_for(input_dir: &Path) -> PathBuf {
    input_dir.join(CORPUS_FILE_NAME)
}

/// Replace every separator byte with a space, in place
pub fn normalize_separators(bytes: &mut [u8], separators: &[u8]) {
    for byte in bytes.iter_mut() {
        if separators.contains(byte) {
            *byte = b' ';
        }
    }
}

/// Decompresses gzip shards and concatenates them into a single corpus
pub struct CorpusAssembler {
    config: CorpusConfig,
}

impl CorpusAssembler {
    pub fn new(config: CorpusConfig) -> Self {
        Self { config }
    }

    /// Append every shard, in the given order, to a freshly created corpus file.
    ///
    /// gzip decoding is blocking, so the whole assembly runs on tokio's
    /// blocking pool. Shards are decoded fully before being written so a
    /// corrupt shard never leaves half its lines in the corpus.
    pub async fn assemble<P: AsRef<Path>>(
        &self,
        shards: &[P],
        corpus_path: &Path,
    ) -> Result<AssemblyReport> {
        let shards: Vec<PathBuf> = shards.iter().map(|p| p.as_ref().to_path_buf()).collect();
        let corpus_path = corpus_path.to_path_buf();
        let config = self.config.clone();

        info!(
            "Assembling {} shards into {}",
            shards.len(),
            corpus_path.display()
        );

        tokio::task::spawn_blocking(move || assemble_blocking(&shards, corpus_path, &config))
            .await
            .context("Corpus assembly task panicked")?
    }
}

fn assemble_blocking(
    shards: &[PathBuf],
    corpus_path: PathBuf,
    config: &CorpusConfig,
) -> Result<AssemblyReport> {
    let file = File::create(&corpus_path)
        .with_context(|| format!("Failed to create corpus {}", corpus_path.display()))?;

    let result = write_corpus(file, shards, corpus_path.clone(), config);
    if result.is_err() {
        // a failed assembly must not leave a partial corpus behind
        if let Err(e) = std::fs::remove_file(&corpus_path) {
            warn!("Failed to remove partial corpus {}: {}", corpus_path.display(), e);
        }
    }
    result
}

fn write_corpus(
    file: File,
    shards: &[PathBuf],
    corpus_path: PathBuf,
    config: &CorpusConfig,
) -> Result<AssemblyReport> {
    let mut writer = BufWriter::with_capacity(config.buffer_size, file);
    let mut report = AssemblyReport {
        corpus_path,
        shards: Vec::with_capacity(shards.len()),
    };

    for shard in shards {
        let start_time = Instant::now();
        match decode_shard(shard, config) {
            Ok((contents, compressed_bytes)) => {
                writer.write_all(&contents)?;
                let stats = ShardStats {
                    shard_path: shard.display().to_string(),
                    compressed_bytes,
                    bytes_written: contents.len() as u64,
                    lines_written: contents.iter().filter(|&&b| b == b'\n').count() as u64,
                    duration_ms: start_time.elapsed().as_millis() as u64,
                    error: None,
                };
                debug!(
                    "Appended {}: {} lines, {} bytes",
                    stats.shard_path, stats.lines_written, stats.bytes_written
                );
                report.shards.push(stats);
            }
            Err(e) => {
                if config.fail_fast {
                    return Err(e);
                }
                warn!("Skipping shard {}: {:#}", shard.display(), e);
                report.shards.push(ShardStats {
                    shard_path: shard.display().to_string(),
                    compressed_bytes: 0,
                    bytes_written: 0,
                    lines_written: 0,
                    duration_ms: start_time.elapsed().as_millis() as u64,
                    error: Some(format!("{e:#}")),
                });
            }
        }
    }

    writer.flush()?;

    info!(
        "Corpus assembled: {} lines, {} bytes, {} failed shards",
        report.total_lines(),
        report.total_bytes(),
        report.failed_shards()
    );

    Ok(report)
}

/// Decode one shard into newline-terminated, separator-normalized bytes
fn decode_shard(shard: &Path, config: &CorpusConfig) -> Result<(Vec<u8>, u64)> {
    let file = File::open(shard)
        .with_context(|| format!("Failed to open shard {}", shard.display()))?;
    let compressed_bytes = file.metadata()?.len();

    let mut decoder = BufReader::with_capacity(config.buffer_size, MultiGzDecoder::new(file));
    let mut contents = Vec::new();
    decoder
        .read_to_end(&mut contents)
        .with_context(|| format!("Failed to decompress shard {}", shard.display()))?;

    normalize_separators(&mut contents, &config.separators);

    // keep the first line of the next shard on its own line
    if !contents.is_empty() && !contents.ends_with(b"\n") {
        contents.push(b'\n');
    }

    Ok((contents, compressed_bytes))
}
