//! Hard, API-boundary error kinds.
//!
//! Soft conditions (`CapacityExhausted`, `NonProgress`) are *not* variants of
//! this enum — they are never raised. They surface as plain data instead:
//! [`crate::cache::DecodeCaches::capacity_exhausted_lines`] and its
//! structured-diagnostic counterpart, [`crate::cache::DecodeCaches::diagnostics`],
//! for the former; the streaming iterator simply ending for the latter.

use recordlift_schema::SchemaError;
use thiserror::Error;

/// Errors reported at the API boundary, before any cache is built or any
/// decode step runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The schema itself is invalid (duplicate field names, or a field name
    /// colliding with the noise label).
    #[error("invalid schema: {0}")]
    InvalidSchema(#[from] SchemaError),

    /// `spansPerLine` does not match `lines` in length, or a span is
    /// malformed (`end <= start`) or out of range for its line.
    #[error("invalid spans: {reason}")]
    InvalidSpans {
        /// Human-readable explanation.
        reason: String,
    },

    /// A feedback assertion could not be reconciled with the document: a
    /// field assertion with `start >= end`, a `line_index` out of range, or
    /// an entity assertion whose file range intersects no line.
    #[error("invalid feedback: {reason}")]
    InvalidFeedback {
        /// Human-readable explanation.
        reason: String,
    },
}
