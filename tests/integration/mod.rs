// Integration test utilities and common code
// WHY: Centralized utilities avoid duplication across integration tests

#![allow(dead_code)]

pub mod fixtures;

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test fixture helper for creating input/output directories with log shards
pub struct TestFixture {
    pub temp_dir: TempDir,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl TestFixture {
    /// Create a new test fixture with temporary input and output directories
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let input_dir = temp_dir.path().join("logs");
        let output_dir = temp_dir.path().join("out");
        fs::create_dir_all(&input_dir).expect("Failed to create input directory");

        Self {
            temp_dir,
            input_dir,
            output_dir,
        }
    }

    /// Write a gzip-compressed shard into the input directory
    pub fn create_gz_shard<P: AsRef<Path>>(&self, relative_path: P, content: &str) -> PathBuf {
        let path = self.input_dir.join(relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(content.as_bytes()).expect("Failed to compress shard");
        fs::write(&path, encoder.finish().expect("Failed to finish gzip stream"))
            .expect("Failed to write shard");
        path
    }

    /// Write a Drain-style structured CSV built from (content, event id, template) rows
    pub fn create_structured_csv(&self, name: &str, rows: &[(&str, &str, &str)]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut writer = csv::Writer::from_path(&path).expect("Failed to open structured CSV");
        writer
            .write_record(["LineId", "Content", "EventId", "EventTemplate"])
            .expect("Failed to write header");
        for (index, (content, event_id, template)) in rows.iter().enumerate() {
            let line_id = (index + 1).to_string();
            writer
                .write_record([line_id.as_str(), content, event_id, template])
                .expect("Failed to write row");
        }
        writer.flush().expect("Failed to flush structured CSV");
        path
    }

    /// Read a file under the output directory
    pub fn read_output<P: AsRef<Path>>(&self, relative_path: P) -> String {
        fs::read_to_string(self.output_dir.join(relative_path)).expect("Failed to read output file")
    }

    pub fn extracted_contents(&self) -> String {
        self.read_output("ExtractionOutput/ExtractedContents.txt")
    }
}

/// Compare two strings line by line, providing detailed diff on mismatch
pub fn assert_golden_file(actual: &str, expected: &str, context: &str) {
    let actual_lines: Vec<&str> = actual.lines().collect();
    let expected_lines: Vec<&str> = expected.lines().collect();

    if actual_lines.len() != expected_lines.len() {
        panic!(
            "{}: Line count mismatch. Expected {} lines, got {} lines",
            context,
            expected_lines.len(),
            actual_lines.len()
        );
    }

    for (i, (actual_line, expected_line)) in actual_lines.iter().zip(expected_lines.iter()).enumerate() {
        if actual_line != expected_line {
            panic!(
                "{}: Line {} mismatch\nExpected: {}\nActual:   {}",
                context,
                i + 1,
                expected_line,
                actual_line
            );
        }
    }
}
