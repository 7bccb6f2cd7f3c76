//! Citation matching
//!
//! Two questions are answered here: does a citation occur in a passage at
//! all (case-insensitive, used for the "found in text" flag), and which byte
//! spans of a passage get marked when its citations are highlighted
//! (literal, longest citation first, first free occurrence only).
//!
//! Citations are always literal text. Nothing in this module builds a
//! pattern from user input.

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::ops::Range;

/// A marked byte range inside a passage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Whether two half-open spans share at least one byte
    pub fn intersects(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Case-fold a string for containment checks.
///
/// Folding goes lower → upper → lower per character so that characters whose
/// case mappings expand (`ß` → `SS`, `ẞ` → `ß`) land on the same form no
/// matter which case the caller started from. Per-character mapping also
/// avoids the context-sensitive final sigma of `str::to_lowercase`.
pub fn fold_case(s: &str) -> String {
    s.chars()
        .flat_map(char::to_lowercase)
        .flat_map(char::to_uppercase)
        .flat_map(char::to_lowercase)
        .collect()
}

/// Does `citation` occur in `text`, ignoring case?
///
/// Empty citation or empty text never matches.
pub fn occurs(citation: &str, text: &str) -> bool {
    if citation.is_empty() || text.is_empty() {
        return false;
    }
    fold_case(text).contains(&fold_case(citation))
}

/// Citations worth highlighting, longest first.
///
/// Blank citations are dropped, repeats keep only their first appearance,
/// and ties in length keep their original order.
pub fn highlight_order<'a, I>(citations: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut ordered: Vec<&str> = Vec::new();
    for citation in citations {
        if citation.trim().is_empty() || ordered.contains(&citation) {
            continue;
        }
        ordered.push(citation);
    }
    // sort_by_key is stable
    ordered.sort_by_key(|c| Reverse(c.chars().count()));
    ordered
}

/// Compute the spans of `text` to mark for the given citations.
///
/// Each citation, longest first, marks the first literal occurrence that
/// does not overlap a span claimed by an earlier (longer) citation. A
/// citation that only occurs inside already-marked text marks nothing, and
/// a citation occurring several times is marked once. The result is sorted
/// by start offset and never contains overlapping spans.
pub fn select_spans<'a, I>(text: &str, citations: I) -> Vec<Span>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut spans: Vec<Span> = Vec::new();

    for citation in highlight_order(citations) {
        if let Some(span) = first_free_occurrence(text, citation, &spans) {
            let at = spans.partition_point(|s| s.start < span.start);
            spans.insert(at, span);
        }
    }

    spans
}

/// First literal occurrence of `needle` in `text` disjoint from `taken`
fn first_free_occurrence(text: &str, needle: &str, taken: &[Span]) -> Option<Span> {
    let mut from = 0;

    while from <= text.len() {
        let offset = text[from..].find(needle)?;
        let start = from + offset;
        let candidate = Span::new(start, start + needle.len());

        if !taken.iter().any(|s| s.intersects(&candidate)) {
            return Some(candidate);
        }

        // Step one character so overlapping candidates are still tried
        let step = text[start..].chars().next().map_or(1, char::len_utf8);
        from = start + step;
    }

    None
}
