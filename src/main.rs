use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use wildspan::aligner::{AlignMode, MarkerSet, WildcardAligner, DEFAULT_MARKER};
use wildspan::corpus::{corpus_path_for, CorpusAssembler, CorpusConfig};
use wildspan::discovery::{self, DiscoveryConfig};
use wildspan::extraction::{run_extraction, write_stats, ExtractConfig};
use wildspan::miner::{run_miner, MinerConfig};

#[derive(Parser, Debug)]
#[command(name = "wildspan")]
#[command(about = "Recover the text behind wildcard placeholders in mined log templates")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Align a single template against the line it was mined from
    Align {
        /// Template containing wildcard markers
        #[arg(long)]
        template: String,

        /// Original log line
        #[arg(long)]
        line: String,

        #[command(flatten)]
        markers: MarkerArgs,
    },

    /// Decompress and concatenate log shards into the mining corpus
    Assemble {
        /// Directory holding compressed shards
        input_dir: PathBuf,

        #[command(flatten)]
        shards: ShardArgs,
    },

    /// Extract wildcard spans from a miner's structured output
    Extract {
        /// Structured file (Drain CSV or JSON Lines)
        structured_file: PathBuf,

        /// Directory receiving the extraction report and event groups
        output_dir: PathBuf,

        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Assemble, mine with an external command, then extract
    Run {
        /// Directory holding compressed shards
        input_dir: PathBuf,

        /// Directory receiving miner output, extraction report and event groups
        output_dir: PathBuf,

        /// Miner program; it must write <output_dir>/<corpus>_structured.csv
        #[arg(long)]
        miner: String,

        /// Miner arguments; {corpus}, {input_dir} and {output_dir} are substituted
        #[arg(last = true)]
        miner_args: Vec<String>,

        /// Keep the assembled corpus after the run
        #[arg(long)]
        keep_corpus: bool,

        #[command(flatten)]
        shards: ShardArgs,

        #[command(flatten)]
        extract: ExtractArgs,
    },
}

#[derive(Args, Debug)]
struct MarkerArgs {
    /// Wildcard marker (repeatable)
    #[arg(long = "marker", default_value = DEFAULT_MARKER)]
    markers: Vec<String>,

    /// Fail when the resolved spans do not reproduce the line
    #[arg(long)]
    strict: bool,
}

impl MarkerArgs {
    fn aligner(&self) -> Result<WildcardAligner> {
        let markers = MarkerSet::new(self.markers.iter().cloned())?;
        let mode = if self.strict { AlignMode::Strict } else { AlignMode::Permissive };
        Ok(WildcardAligner::new(markers, mode))
    }
}

#[derive(Args, Debug)]
struct ShardArgs {
    /// Glob matched against shard file names
    #[arg(long, default_value = "*.gz")]
    pattern: String,

    /// Search subdirectories for shards
    #[arg(long)]
    recursive: bool,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    #[command(flatten)]
    markers: MarkerArgs,

    /// Abort on first error
    #[arg(long)]
    fail_fast: bool,

    /// Replace an existing extraction report
    #[arg(long)]
    overwrite: bool,

    /// Only export event groups, skip wildcard extraction
    #[arg(long)]
    no_extract: bool,

    /// Concurrent alignment chunks (defaults to CPU count)
    #[arg(long)]
    jobs: Option<usize>,

    /// Suppress console progress bars
    #[arg(long)]
    no_progress: bool,

    /// Stats output file path
    #[arg(long)]
    stats_out: Option<PathBuf>,
}

impl ExtractArgs {
    fn config(&self) -> Result<ExtractConfig> {
        let aligner = self.markers.aligner()?;
        let defaults = ExtractConfig::default();
        Ok(ExtractConfig {
            markers: aligner.markers().clone(),
            mode: aligner.mode(),
            fail_fast: self.fail_fast,
            jobs: self.jobs.unwrap_or(defaults.jobs),
            show_progress: !self.no_progress,
            overwrite: self.overwrite,
            extract_wildcards: !self.no_extract,
            export_groups: true,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries command output, logs go to stderr
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    info!(?cli, "Parsed CLI arguments");

    match cli.command {
        Command::Align { template, line, markers } => {
            let aligner = markers.aligner()?;
            println!("{}", aligner.extract(&template, &line)?);
        }
        Command::Assemble { input_dir, shards } => {
            let corpus = assemble(&input_dir, &shards, false).await?;
            println!("{}", corpus.display());
        }
        Command::Extract { structured_file, output_dir, extract } => {
            let config = extract.config()?;
            let stats = run_extraction(&structured_file, &output_dir, &config).await?;
            if let Some(ref stats_out) = extract.stats_out {
                write_stats(stats_out, &stats).await?;
            }
            print_summary(&stats);
        }
        Command::Run {
            input_dir,
            output_dir,
            miner,
            miner_args,
            keep_corpus,
            shards,
            extract,
        } => {
            let config = extract.config()?;
            let corpus = assemble(&input_dir, &shards, extract.fail_fast).await?;

            let miner = MinerConfig { program: miner, args: miner_args };
            let mined = run_miner(&miner, &corpus, &input_dir, &output_dir).await;

            if !keep_corpus {
                if let Err(e) = tokio::fs::remove_file(&corpus).await {
                    tracing::warn!("Failed to remove corpus {}: {}", corpus.display(), e);
                }
            }

            let stats = run_extraction(&mined?, &output_dir, &config).await?;
            if let Some(ref stats_out) = extract.stats_out {
                write_stats(stats_out, &stats).await?;
            }
            print_summary(&stats);
        }
    }

    Ok(())
}

async fn assemble(input_dir: &Path, shards: &ShardArgs, fail_fast: bool) -> Result<PathBuf> {
    // WHY: validate input directory early to fail fast with clear error
    if !input_dir.is_dir() {
        anyhow::bail!("Input directory does not exist: {}", input_dir.display());
    }

    let discovery_config = DiscoveryConfig {
        fail_fast,
        pattern: shards.pattern.clone(),
        recursive: shards.recursive,
    };
    let discovered = discovery::collect_discovered_shards(input_dir, discovery_config).await?;
    let valid: Vec<_> = discovered
        .iter()
        .filter(|s| s.error.is_none())
        .map(|s| &s.path)
        .collect();

    if valid.is_empty() {
        anyhow::bail!("No shards matching {} in {}", shards.pattern, input_dir.display());
    }

    let corpus = corpus_path_for(input_dir);
    let assembler = CorpusAssembler::new(CorpusConfig {
        fail_fast,
        ..Default::default()
    });
    let report = assembler.assemble(&valid, &corpus).await?;

    info!(
        "Assembled {} shards ({} failed) into {}",
        report.shards.len(),
        report.failed_shards(),
        corpus.display()
    );

    Ok(corpus)
}

fn print_summary(stats: &wildspan::RunStats) {
    println!("wildspan v{} - extraction complete", env!("CARGO_PKG_VERSION"));
    println!("  Records processed: {}", stats.records_processed);
    if stats.records_skipped > 0 {
        println!("  Records skipped: {}", stats.records_skipped);
    }
    println!("  Wildcard occurrences: {}", stats.occurrences_extracted);
    if stats.strict_failures > 0 {
        println!("  Strict failures: {}", stats.strict_failures);
    }
    println!("  Event groups exported: {}", stats.groups_exported);
    if let Some(ref report) = stats.extracted_contents {
        println!("  Extraction report: {report}");
    }
}
