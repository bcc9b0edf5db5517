// WHY: marker discovery - ordered scan of a template for any marker in the set
// Positions are character offsets so arithmetic stays valid for non-ASCII templates

use super::MarkerSet;
use tracing::debug;

/// One marker appearance found during the left-to-right scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerOccurrence<'m> {
    pub marker: &'m str,
    /// Character offset in the original template
    pub position: usize,
}

/// Find every marker occurrence in `template`, in scan order.
///
/// Each step picks the earliest match of any marker at or after the cursor,
/// then moves the cursor one character past the *start* of that match. A
/// marker that overlaps or contains another can therefore be reported more
/// than once for the same stretch of text. Ties between markers starting at
/// the same position go to the marker listed first in the set.
pub fn discover_markers<'m>(template: &str, markers: &'m MarkerSet) -> Vec<MarkerOccurrence<'m>> {
    let haystack: Vec<char> = template.chars().collect();
    let needles: Vec<(&'m str, Vec<char>)> = markers
        .iter()
        .map(|marker| (marker, marker.chars().collect()))
        .collect();

    let mut occurrences = Vec::new();
    let mut cursor = 0;

    loop {
        let earliest = needles
            .iter()
            .filter_map(|(marker, needle)| {
                find_chars(&haystack, needle, cursor).map(|position| (position, *marker))
            })
            .min_by_key(|(position, _)| *position);

        match earliest {
            Some((position, marker)) => {
                debug!(marker, position, "Discovered marker occurrence");
                occurrences.push(MarkerOccurrence { marker, position });
                cursor = position + 1;
            }
            None => break,
        }
    }

    occurrences
}

/// Character-slice counterpart of `str::find` starting at `from`
pub(crate) fn find_chars(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    if needle.is_empty() {
        return Some(from);
    }
    if needle.len() > haystack.len() - from {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| offset + from)
}
