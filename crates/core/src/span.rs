//! Span and line model: per-line candidate spans with line-relative offsets.

use recordlift_diagnostics::ByteSpan;
use serde::{Deserialize, Serialize};

/// A line-relative candidate span, `[start, end)` in bytes within its line's text.
pub type Span = ByteSpan;

/// The ordered candidate spans for one line of the document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineSpans {
    /// The 0-based index of the line these spans belong to.
    pub line_index: usize,
    /// Candidate spans, ordered by `(start, end)`. May overlap.
    pub spans: Vec<Span>,
}

impl LineSpans {
    /// Construct a `LineSpans`, sorting its spans by `(start, end)`.
    pub fn new(line_index: usize, mut spans: Vec<Span>) -> Self {
        spans.sort_by_key(|s| (s.start, s.end));
        Self { line_index, spans }
    }
}

/// `true` if every character in `text` is ASCII/Unicode whitespace (including
/// the empty string).
pub fn is_whitespace_only(text: &str) -> bool {
    text.chars().all(char::is_whitespace)
}

/// Slice out `span`'s text from `line`, panicking if the span is out of
/// range — callers are expected to have validated spans against line
/// lengths before reaching this point.
pub fn span_text<'a>(line: &'a str, span: Span) -> &'a str {
    &line[span.start..span.end]
}
