// WHY: Wildcard token aligner - inverts the abstraction a template miner performed
// Marker discovery and span resolution live in separate modules and share only the template text

use std::fmt;
use thiserror::Error;
use tracing::debug;

pub mod markers;
pub mod resolution;

pub use markers::{discover_markers, MarkerOccurrence};
pub use resolution::resolve_spans;

/// Placeholder emitted by Drain-style miners for a variable token
pub const DEFAULT_MARKER: &str = "<*>";

/// Errors reported by marker-set construction and strict alignment
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlignError {
    #[error("marker strings must not be empty")]
    EmptyMarker,

    #[error("template with {occurrences} wildcard occurrence(s) does not partition the line")]
    MismatchedOccurrenceCount { occurrences: usize },

    #[error("occurrence {index} of marker {marker:?} vanished from the running template")]
    UnresolvedOccurrence { marker: String, index: usize },
}

/// How the aligner treats input that breaks the miner's contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignMode {
    /// Never fails; unmatched boundaries extend to the end of the line
    #[default]
    Permissive,
    /// Fails when the resolved spans do not reproduce the line exactly
    Strict,
}

/// Ordered set of distinct marker strings, fixed for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerSet {
    markers: Vec<String>,
}

impl MarkerSet {
    /// Build a marker set, dropping repeats and keeping first-seen order.
    ///
    /// An empty marker would match at every character, so it is rejected.
    pub fn new<I, S>(markers: I) -> Result<Self, AlignError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for marker in markers {
            let marker = marker.into();
            if marker.is_empty() {
                return Err(AlignError::EmptyMarker);
            }
            if !unique.contains(&marker) {
                unique.push(marker);
            }
        }
        Ok(Self { markers: unique })
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.markers.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

impl Default for MarkerSet {
    fn default() -> Self {
        Self {
            markers: vec![DEFAULT_MARKER.to_string()],
        }
    }
}

/// One resolved (marker, span) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedSpan<'m> {
    pub marker: &'m str,
    pub span: String,
}

/// Result of aligning one template against one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment<'m> {
    /// Pairs in template order, one per discovered occurrence
    pub pairs: Vec<ExtractedSpan<'m>>,
    /// Template after every resolvable occurrence was replaced by its span
    pub running_template: String,
    /// Indices into `pairs` whose marker could not be located during resolution
    pub unresolved: Vec<usize>,
}

impl Alignment<'_> {
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Spans only, in template order
    pub fn spans(&self) -> Vec<&str> {
        self.pairs.iter().map(|pair| pair.span.as_str()).collect()
    }
}

impl fmt::Display for Alignment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_pairs(&self.pairs))
    }
}

/// Render pairs as `"<marker> : <span>"` joined by `", "`
pub fn format_pairs(pairs: &[ExtractedSpan<'_>]) -> String {
    pairs
        .iter()
        .map(|pair| format!("{} : {}", pair.marker, pair.span))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Permissive alignment: discover occurrences, then resolve them against `line`
pub fn align<'m>(template: &str, line: &str, markers: &'m MarkerSet) -> Alignment<'m> {
    let occurrences = discover_markers(template, markers);
    debug!(
        occurrences = occurrences.len(),
        "Looking for markers: {:?}",
        occurrences.iter().map(|o| o.marker).collect::<Vec<_>>()
    );
    resolve_spans(&occurrences, template, line)
}

/// Permissive alignment rendered in the external output format
pub fn extract_wildcards(template: &str, line: &str, markers: &MarkerSet) -> String {
    align(template, line, markers).to_string()
}

/// Reusable aligner bundling a marker set with an alignment mode
#[derive(Debug, Clone, Default)]
pub struct WildcardAligner {
    markers: MarkerSet,
    mode: AlignMode,
}

impl WildcardAligner {
    pub fn new(markers: MarkerSet, mode: AlignMode) -> Self {
        Self { markers, mode }
    }

    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    pub fn mode(&self) -> AlignMode {
        self.mode
    }

    /// Align `template` against `line` honouring the configured mode
    pub fn align<'a>(&'a self, template: &str, line: &str) -> Result<Alignment<'a>, AlignError> {
        let alignment = align(template, line, &self.markers);

        if self.mode == AlignMode::Strict {
            if let Some(&index) = alignment.unresolved.first() {
                return Err(AlignError::UnresolvedOccurrence {
                    marker: alignment.pairs[index].marker.to_string(),
                    index,
                });
            }
            if alignment.running_template != line {
                return Err(AlignError::MismatchedOccurrenceCount {
                    occurrences: alignment.pairs.len(),
                });
            }
        }

        Ok(alignment)
    }

    /// Align and render in the external output format
    pub fn extract(&self, template: &str, line: &str) -> Result<String, AlignError> {
        self.align(template, line).map(|alignment| alignment.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers(list: &[&str]) -> MarkerSet {
        MarkerSet::new(list.iter().copied()).unwrap()
    }

    #[test]
    fn test_no_markers_gives_empty_result() {
        let set = MarkerSet::default();
        assert_eq!(extract_wildcards("plain text only", "anything at all", &set), "");
        assert_eq!(extract_wildcards("", "", &set), "");
    }

    #[test]
    fn test_lone_marker_takes_whole_line() {
        let set = MarkerSet::default();
        let alignment = align("<*>", "the entire line, verbatim", &set);
        assert_eq!(alignment.spans(), vec!["the entire line, verbatim"]);
        assert_eq!(alignment.to_string(), "<*> : the entire line, verbatim");
    }

    #[test]
    fn test_trailing_marker_runs_to_end() {
        let set = MarkerSet::default();
        assert_eq!(extract_wildcards("user <*>", "user alice", &set), "<*> : alice");
    }

    #[test]
    fn test_repeated_marker() {
        let set = MarkerSet::default();
        assert_eq!(
            extract_wildcards("<*> to <*>", "alice to bob", &set),
            "<*> : alice, <*> : bob"
        );
    }

    #[test]
    fn test_distinct_markers() {
        let set = markers(&["<ID>", "<NAME>"]);
        assert_eq!(
            extract_wildcards("id=<ID> name=<NAME>", "id=42 name=alice", &set),
            "<ID> : 42, <NAME> : alice"
        );
    }

    #[test]
    fn test_ambiguous_boundary_cuts_at_first_match() {
        let set = MarkerSet::default();
        let alignment = align("<*>,<*>", "a,b,c", &set);
        assert_eq!(alignment.spans(), vec!["a", "b,c"]);
        assert_eq!(alignment.to_string(), "<*> : a, <*> : b,c");
    }

    #[test]
    fn test_missing_boundary_extends_to_end() {
        let set = MarkerSet::default();
        // ':' never appears in the line after the marker start
        let alignment = align("took <*>: done", "took 15ms done", &set);
        assert_eq!(alignment.spans(), vec!["15ms done"]);
    }

    #[test]
    fn test_round_trip_reproduces_line() {
        let set = MarkerSet::default();
        let line = "Connection 10.0.0.7 closed by peer-3";
        let alignment = align("Connection <*> closed by <*>", line, &set);
        assert_eq!(alignment.spans(), vec!["10.0.0.7", "peer-3"]);
        assert_eq!(alignment.running_template, line);
        assert!(alignment.unresolved.is_empty());
    }

    #[test]
    fn test_character_offsets_for_non_ascii() {
        let set = MarkerSet::default();
        let alignment = align("café <*> prêt <*>", "café naïve prêt 東京", &set);
        assert_eq!(alignment.spans(), vec!["naïve", "東京"]);
        assert_eq!(alignment.running_template, "café naïve prêt 東京");
    }

    #[test]
    fn test_adjacent_markers_use_marker_text_as_boundary() {
        let set = MarkerSet::default();
        // boundary is '<' from the second marker, absent from the line
        let alignment = align("<*><*>", "ab", &set);
        assert_eq!(alignment.spans(), vec!["ab", ""]);
    }

    #[test]
    fn test_marker_start_past_line_end_gives_empty_span() {
        let set = MarkerSet::default();
        let alignment = align("a long literal prefix <*>", "short", &set);
        assert_eq!(alignment.spans(), vec![""]);
    }

    #[test]
    fn test_overlapping_markers_leave_unresolved_occurrence() {
        let set = markers(&["<*>", "*"]);
        let alignment = align("<*>", "abc", &set);
        assert_eq!(alignment.to_string(), "<*> : abc, * : c");
        assert_eq!(alignment.unresolved, vec![1]);

        let set = markers(&["aa"]);
        let alignment = align("aaa", "xyz", &set);
        assert_eq!(alignment.to_string(), "aa : xyz, aa : z");
        assert_eq!(alignment.unresolved, vec![1]);
    }

    #[test]
    fn test_marker_set_rejects_empty_and_dedups() {
        assert_eq!(MarkerSet::new(["<*>", ""]), Err(AlignError::EmptyMarker));

        let set = markers(&["<A>", "<B>", "<A>"]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["<A>", "<B>"]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_strict_mode_accepts_exact_partition() {
        let aligner = WildcardAligner::new(MarkerSet::default(), AlignMode::Strict);
        assert_eq!(
            aligner.extract("<*> to <*>", "alice to bob").unwrap(),
            "<*> : alice, <*> : bob"
        );
    }

    #[test]
    fn test_strict_mode_rejects_mismatch() {
        let aligner = WildcardAligner::new(MarkerSet::default(), AlignMode::Strict);
        // span "a b" contains the boundary character, so the rewrite diverges
        let err = aligner.align("<*> x", "a b x").unwrap_err();
        assert_eq!(err, AlignError::MismatchedOccurrenceCount { occurrences: 1 });

        let permissive = WildcardAligner::default();
        assert_eq!(permissive.extract("<*> x", "a b x").unwrap(), "<*> : a");
    }

    #[test]
    fn test_strict_mode_reports_unresolved_occurrence() {
        let aligner = WildcardAligner::new(markers(&["<*>", "*"]), AlignMode::Strict);
        let err = aligner.align("<*>", "abc").unwrap_err();
        assert_eq!(
            err,
            AlignError::UnresolvedOccurrence {
                marker: "*".to_string(),
                index: 1
            }
        );
    }

    #[test]
    fn test_strict_mode_rejects_literal_mismatch_without_markers() {
        let aligner = WildcardAligner::new(MarkerSet::default(), AlignMode::Strict);
        assert!(aligner.align("static text", "static text").unwrap().is_empty());
        assert!(aligner.align("static text", "other text").is_err());
    }
}
