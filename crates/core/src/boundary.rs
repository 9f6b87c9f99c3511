//! Boundary and entity-type labels attached to a decoded line.

use serde::{Deserialize, Serialize};

/// Per-line boundary label: does this line begin a new record, or continue
/// the previous one?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Boundary {
    /// First line of a record.
    B,
    /// Continuation of the current record.
    C,
}

/// The role a `B`-boundary line plays within its record.
///
/// Only meaningful when the line's [`Boundary`] is `B`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    /// The primary contact of the record.
    Primary,
    /// A guardian, attached to a preceding primary.
    Guardian,
    /// Could not be classified confidently.
    Unknown,
}
