pub mod aligner;
pub mod corpus;
pub mod discovery;
pub mod extraction;
pub mod grouping;
pub mod mined;
pub mod miner;

// Re-export main types for convenient access
pub use aligner::{
    align, extract_wildcards, format_pairs, AlignError, AlignMode, Alignment, ExtractedSpan,
    MarkerSet, WildcardAligner, DEFAULT_MARKER,
};

// Re-export batch driver types
pub use extraction::{run_extraction, ExtractConfig, RecordOutcome, RunStats};
pub use mined::{read_mined_records, MinedRecord};
