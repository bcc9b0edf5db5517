// WHY: launches the external template miner; its clustering is not our concern
// Only the command line, exit status and location of its structured output are

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{info, warn};

/// External miner invocation. Arguments may contain the placeholders
/// `{corpus}`, `{input_dir}` and `{output_dir}`.
#[derive(Debug, Clone)]
pub struct MinerConfig {
    pub program: String,
    pub args: Vec<String>,
}

/// Where a Drain-style miner leaves its per-line output
pub fn structured_output_path(output_dir: &Path, corpus_path: &Path) -> PathBuf {
    let name = corpus_path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "corpus".to_string());
    output_dir.join(format!("{name}_structured.csv"))
}

/// Substitute path placeholders into the configured arguments
pub fn render_args(args: &[String], corpus_path: &Path, input_dir: &Path, output_dir: &Path) -> Vec<String> {
    args.iter()
        .map(|arg| {
            arg.replace("{corpus}", &corpus_path.to_string_lossy())
                .replace("{input_dir}", &input_dir.to_string_lossy())
                .replace("{output_dir}", &output_dir.to_string_lossy())
        })
        .collect()
}

/// Run the miner to completion and return the path of its structured output
pub async fn run_miner(
    config: &MinerConfig,
    corpus_path: &Path,
    input_dir: &Path,
    output_dir: &Path,
) -> Result<PathBuf> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let args = render_args(&config.args, corpus_path, input_dir, output_dir);
    info!(program = %config.program, ?args, "Launching template miner");

    let start_time = std::time::Instant::now();
    let output = Command::new(&config.program)
        .args(&args)
        .output()
        .await
        .with_context(|| format!("Failed to launch miner {}", config.program))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!("Miner stderr: {}", stderr.trim());
        anyhow::bail!("Miner {} exited with {}", config.program, output.status);
    }

    let structured = structured_output_path(output_dir, corpus_path);
    let produced = tokio::fs::try_exists(&structured)
        .await
        .with_context(|| format!("Failed to check miner output {}", structured.display()))?;
    if !produced {
        anyhow::bail!(
            "Miner finished but produced no structured output at {}",
            structured.display()
        );
    }

    info!(
        "Miner completed in {}ms, structured output at {}",
        start_time.elapsed().as_millis(),
        structured.display()
    );

    Ok(structured)
}
