//! Byte-span, line-offset, and diagnostic primitives shared by the
//! recordlift decoder.
//!
//! Provides [`ByteSpan`], a half-open `[start, end)` byte range,
//! [`LineOffsets`], a table of per-line file offsets built from line
//! *lengths* rather than from a single contiguous string — the decoder
//! always receives lines that have already been split on newlines, so there
//! is no source text to re-scan — and [`Diagnostic`]/[`Severity`], the
//! structured-reporting pair used to surface soft (non-fatal) decode
//! conditions without throwing.

#![warn(missing_docs)]

use serde::{Deserialize, Serialize};

/// A half-open byte range `[start, end)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteSpan {
    /// Byte offset of the first character (0-based).
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
}

impl ByteSpan {
    /// Create a span covering `[start, end)`.
    ///
    /// Panics if `end < start`.
    pub fn new(start: usize, end: usize) -> Self {
        assert!(end >= start, "ByteSpan end ({end}) < start ({start})");
        Self { start, end }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// `true` when the span is zero-width.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The intersection of two spans, or `None` if they do not overlap.
    pub fn intersect(&self, other: &ByteSpan) -> Option<ByteSpan> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then(|| ByteSpan::new(start, end))
    }
}

/// Per-line file offsets for a document that arrives as an ordered sequence
/// of lines (no trailing newline per element).
///
/// Each line is assumed to be separated from the next by exactly one
/// newline byte, matching the file-offset contract used throughout the
/// decoder and assembler (`fileStart = lineStart + start`).
#[derive(Debug, Clone)]
pub struct LineOffsets {
    /// File offset of the start of each line.
    starts: Vec<usize>,
    /// File offset one past the end of each line's text (before its newline).
    ends: Vec<usize>,
}

impl LineOffsets {
    /// Build a `LineOffsets` table from line lengths, assuming each line is
    /// followed by a single newline byte (including the last).
    pub fn from_line_lengths<I>(lengths: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let mut starts = Vec::new();
        let mut ends = Vec::new();
        let mut pos = 0usize;
        for len in lengths {
            starts.push(pos);
            ends.push(pos + len);
            pos += len + 1;
        }
        Self { starts, ends }
    }

    /// File offset of the start of `line`, or `None` if out of range.
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.starts.get(line).copied()
    }

    /// File offset one past the end of `line`'s text, or `None` if out of range.
    pub fn line_end(&self, line: usize) -> Option<usize> {
        self.ends.get(line).copied()
    }

    /// The `[start, end)` span of `line`'s text in file offsets.
    pub fn line_span(&self, line: usize) -> Option<ByteSpan> {
        Some(ByteSpan::new(self.line_start(line)?, self.line_end(line)?))
    }

    /// Number of lines this table covers.
    pub fn line_count(&self) -> usize {
        self.starts.len()
    }
}

/// Severity level for a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A soft condition the decode recovered from on its own.
    Warn,
    /// An informational note with no bearing on the result's validity.
    Info,
}

/// A structured report of a non-fatal condition encountered during decode
/// (e.g. a line whose state enumeration hit `maxStates`).
///
/// Soft conditions are never raised as errors — a caller that doesn't care
/// can ignore the diagnostic list entirely and still get a valid result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// A stable, short identifier for the condition, e.g. `"capacity_exhausted"`.
    pub id: &'static str,
    /// This diagnostic's severity.
    pub severity: Severity,
    /// Human-readable explanation.
    pub message: String,
    /// The line this diagnostic concerns, if any.
    pub line: Option<usize>,
}

impl Diagnostic {
    /// Construct a `Warn`-severity diagnostic for `line`.
    pub fn warn(id: &'static str, message: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            id,
            severity: Severity::Warn,
            message: message.into(),
            line,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warn => write!(f, "warn"),
            Severity::Info => write!(f, "info"),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}[{}]: {} (line {line})", self.severity, self.id, self.message),
            None => write!(f, "{}[{}]: {}", self.severity, self.id, self.message),
        }
    }
}
