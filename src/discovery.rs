use anyhow::{Context, Result};
use futures::stream::{self, Stream, StreamExt};
use glob::Pattern;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio_stream::wrappers::ReadDirStream;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::corpus::CORPUS_FILE_NAME;

/// Configuration for shard discovery behavior
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Whether to fail fast on first error or continue processing
    pub fail_fast: bool,
    /// Glob matched against each file name
    pub pattern: String,
    /// Descend into subdirectories
    pub recursive: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            pattern: "*.gz".to_string(),
            recursive: false,
        }
    }
}

/// Result of shard discovery validation
#[derive(Debug, Clone)]
pub struct ShardValidation {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub error: Option<String>,
}

/// Discovers compressed log shards under `root_dir` whose file name matches
/// `config.pattern`. The assembled corpus file is never reported.
///
/// Stream order follows the directory listing; use
/// [`collect_discovered_shards`] for name-sorted output.
pub fn discover_shards(
    root_dir: impl AsRef<Path>,
    config: DiscoveryConfig,
) -> impl Stream<Item = Result<ShardValidation>> {
    let root_path = root_dir.as_ref().to_path_buf();
    let config = Arc::new(config);

    stream::once(list_candidates(root_path, Arc::clone(&config))).flat_map(move |listing| {
        let config = Arc::clone(&config);
        match listing {
            Ok(paths) => stream::iter(paths)
                .then(move |path| {
                    let config = Arc::clone(&config);
                    async move { validate_shard(path, &config).await }
                })
                .boxed(),
            Err(e) => stream::once(async move { Err(e) }).boxed(),
        }
    })
}

async fn list_candidates(root_dir: PathBuf, config: Arc<DiscoveryConfig>) -> Result<Vec<PathBuf>> {
    let pattern = Pattern::new(&config.pattern)
        .with_context(|| format!("Invalid shard pattern: {}", config.pattern))?;

    info!(
        "Listing shards in {} (pattern {}, recursive {})",
        root_dir.display(),
        config.pattern,
        config.recursive
    );

    let paths = if config.recursive {
        let fail_fast = config.fail_fast;
        tokio::task::spawn_blocking(move || walk_recursive(&root_dir, fail_fast))
            .await
            .context("Directory walk task panicked")??
    } else {
        let entries = fs::read_dir(&root_dir)
            .await
            .with_context(|| format!("Cannot read input directory {}", root_dir.display()))?;
        let mut listing = ReadDirStream::new(entries);
        let mut paths = Vec::new();
        while let Some(entry) = listing.next().await {
            let entry = entry?;
            if entry.file_type().await?.is_file() {
                paths.push(entry.path());
            }
        }
        paths
    };

    Ok(paths
        .into_iter()
        .filter(|path| is_shard_candidate(path, &pattern))
        .collect())
}

fn walk_recursive(root_dir: &Path, fail_fast: bool) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(root_dir).follow_links(false) {
        match entry {
            Ok(entry) if entry.file_type().is_file() => paths.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => {
                if fail_fast {
                    return Err(anyhow::anyhow!("Directory walk error: {e}"));
                }
                warn!("Directory walk error (continuing): {}", e);
            }
        }
    }
    Ok(paths)
}

fn is_shard_candidate(path: &Path, pattern: &Pattern) -> bool {
    match path.file_name().and_then(|name| name.to_str()) {
        Some(CORPUS_FILE_NAME) => false,
        Some(name) => {
            let matched = pattern.matches(name);
            if matched {
                debug!("Found matching shard: {}", path.display());
            }
            matched
        }
        None => false,
    }
}

async fn validate_shard(path: PathBuf, config: &DiscoveryConfig) -> Result<ShardValidation> {
    match fs::metadata(&path).await {
        Ok(metadata) if metadata.is_file() => Ok(ShardValidation {
            path,
            size_bytes: metadata.len(),
            error: None,
        }),
        Ok(_) => {
            let error = format!("Path is not a file: {}", path.display());
            warn!("{}", error);
            Ok(ShardValidation {
                path,
                size_bytes: 0,
                error: Some(error),
            })
        }
        Err(e) => {
            let error = format!("Cannot access shard {}: {}", path.display(), e);
            warn!("{}", error);

            if config.fail_fast {
                Err(anyhow::anyhow!(error))
            } else {
                Ok(ShardValidation {
                    path,
                    size_bytes: 0,
                    error: Some(error),
                })
            }
        }
    }
}

/// Collect all discovered shards, sorted by file name (full path breaks ties)
pub async fn collect_discovered_shards(
    root_dir: impl AsRef<Path>,
    config: DiscoveryConfig,
) -> Result<Vec<ShardValidation>> {
    let mut shards = Vec::new();
    let mut stream = Box::pin(discover_shards(root_dir, config));

    while let Some(result) = stream.next().await {
        shards.push(result?);
    }

    shards.sort_by(|a, b| {
        a.path
            .file_name()
            .cmp(&b.path.file_name())
            .then_with(|| a.path.cmp(&b.path))
    });

    let valid_count = shards.iter().filter(|s| s.error.is_none()).count();
    let invalid_count = shards.len() - valid_count;

    if invalid_count > 0 {
        warn!("Found {} shards with validation issues", invalid_count);
    }

    info!("Shard discovery summary: {} valid, {} invalid", valid_count, invalid_count);

    Ok(shards)
}

/// Paths of valid shards under `root_dir` using the default configuration
pub async fn find_shards<P: AsRef<Path>>(root_dir: P) -> Result<Vec<PathBuf>> {
    let validations = collect_discovered_shards(root_dir, DiscoveryConfig::default()).await?;

    Ok(validations
        .into_iter()
        .filter(|v| v.error.is_none())
        .map(|v| v.path)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_file(dir: &Path, name: &str, content: &[u8]) -> Result<PathBuf> {
        let file_path = dir.join(name);
        if let Some(parent) = file_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&file_path, content).await?;
        Ok(file_path)
    }

    fn names(shards: &[ShardValidation]) -> Vec<String> {
        shards
            .iter()
            .map(|s| s.path.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_discover_shards_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let shards = collect_discovered_shards(temp_dir.path(), DiscoveryConfig::default())
            .await
            .unwrap();
        assert!(shards.is_empty());
    }

    #[tokio::test]
    async fn test_discover_shards_sorted_and_filtered() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(temp_dir.path(), "b.log.gz", b"x").await.unwrap();
        create_test_file(temp_dir.path(), "a.log.gz", b"xy").await.unwrap();
        create_test_file(temp_dir.path(), "notes.txt", b"ignored").await.unwrap();
        create_test_file(temp_dir.path(), "nested/c.log.gz", b"deep").await.unwrap();

        let shards = collect_discovered_shards(temp_dir.path(), DiscoveryConfig::default())
            .await
            .unwrap();
        assert_eq!(names(&shards), vec!["a.log.gz", "b.log.gz"]);
        assert_eq!(shards[0].size_bytes, 2);
        assert!(shards.iter().all(|s| s.error.is_none()));
    }

    #[tokio::test]
    async fn test_discover_shards_recursive() {
        let temp_dir = TempDir::new().unwrap();
        // directory nesting must not influence the order
        create_test_file(temp_dir.path(), "b.gz", b"x").await.unwrap();
        create_test_file(temp_dir.path(), "sub/a.gz", b"x").await.unwrap();
        create_test_file(temp_dir.path(), "sub/deeper/c.gz", b"x").await.unwrap();
        create_test_file(temp_dir.path(), "z/b.gz", b"x").await.unwrap();

        let config = DiscoveryConfig {
            recursive: true,
            ..Default::default()
        };
        let shards = collect_discovered_shards(temp_dir.path(), config).await.unwrap();
        assert_eq!(names(&shards), vec!["a.gz", "b.gz", "b.gz", "c.gz"]);
        assert_eq!(shards[1].path, temp_dir.path().join("b.gz"));
        assert_eq!(shards[2].path, temp_dir.path().join("z/b.gz"));
    }

    #[tokio::test]
    async fn test_corpus_file_is_never_a_shard() {
        let temp_dir = TempDir::new().unwrap();
        create_test_file(temp_dir.path(), "a.gz", b"x").await.unwrap();
        create_test_file(temp_dir.path(), CORPUS_FILE_NAME, b"old corpus").await.unwrap();

        let config = DiscoveryConfig {
            pattern: "*".to_string(),
            ..Default::default()
        };
        let shards = collect_discovered_shards(temp_dir.path(), config).await.unwrap();
        assert_eq!(names(&shards), vec!["a.gz"]);
    }

    #[tokio::test]
    async fn test_invalid_pattern_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let config = DiscoveryConfig {
            pattern: "[".to_string(),
            ..Default::default()
        };
        assert!(collect_discovered_shards(temp_dir.path(), config).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_directory_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("absent");
        assert!(find_shards(&missing).await.is_err());
    }
}
