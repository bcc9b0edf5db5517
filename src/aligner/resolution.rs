// WHY: span resolution - turns discovered occurrences into concrete spans of the line
// The running template is rewritten after each occurrence so later offsets line up with the line

use super::markers::{find_chars, MarkerOccurrence};
use super::{Alignment, ExtractedSpan};
use tracing::debug;

/// Resolve each occurrence, in order, to the span of `line` it replaced.
///
/// The occurrence is looked up afresh in the running template (from offset 0),
/// and the character right after it is used as the boundary to search for in
/// `line`. With no boundary character, or when the boundary never appears at
/// or after the occurrence start, the span extends to the end of the line.
pub fn resolve_spans<'m>(
    occurrences: &[MarkerOccurrence<'m>],
    template: &str,
    line: &str,
) -> Alignment<'m> {
    let mut running: Vec<char> = template.chars().collect();
    let line_chars: Vec<char> = line.chars().collect();
    let mut pairs = Vec::with_capacity(occurrences.len());
    let mut unresolved = Vec::new();

    for (index, occurrence) in occurrences.iter().enumerate() {
        let needle: Vec<char> = occurrence.marker.chars().collect();

        let Some(start) = find_chars(&running, &needle, 0) else {
            debug!(
                marker = occurrence.marker,
                index, "Occurrence no longer present in running template"
            );
            unresolved.push(index);
            let span = resolve_from_last(&mut running, &line_chars, needle.len());
            pairs.push(ExtractedSpan {
                marker: occurrence.marker,
                span,
            });
            continue;
        };

        let end = start + needle.len();
        let boundary = running.get(end).copied();
        let span = span_in_line(&line_chars, start, boundary);

        debug!(
            marker = occurrence.marker,
            start,
            end,
            boundary = ?boundary,
            span_len = span.len(),
            "Resolved occurrence"
        );

        running.splice(start..end, span.iter().copied());
        pairs.push(ExtractedSpan {
            marker: occurrence.marker,
            span: span.iter().collect(),
        });
    }

    Alignment {
        pairs,
        running_template: running.into_iter().collect(),
        unresolved,
    }
}

/// Resolve an occurrence that is missing from the running template.
///
/// The start offset is taken as one before the beginning, which wraps to the
/// last character of both the line and the running template. The boundary is
/// the running-template character at `marker_len - 1`; the span is the last
/// character of the line unless that character is the boundary itself.
fn resolve_from_last(running: &mut Vec<char>, line: &[char], marker_len: usize) -> String {
    let end = marker_len.saturating_sub(1);
    let tail: &[char] = match line.last() {
        Some(last) => std::slice::from_ref(last),
        None => &[],
    };
    let span = match (running.get(end), tail.first()) {
        (Some(boundary), Some(last)) if boundary == last => &tail[..0],
        _ => tail,
    };

    let mut rewritten = running[..running.len().saturating_sub(1)].to_vec();
    rewritten.extend_from_slice(span);
    rewritten.extend_from_slice(&running[end.min(running.len())..]);
    *running = rewritten;

    span.iter().collect()
}

fn span_in_line(line: &[char], start: usize, boundary: Option<char>) -> &[char] {
    if start >= line.len() {
        return &[];
    }
    let rest = &line[start..];
    match boundary {
        None => rest,
        Some(boundary) => match rest.iter().position(|&ch| ch == boundary) {
            Some(offset) => &rest[..offset],
            None => rest,
        },
    }
}
