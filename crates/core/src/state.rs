//! The decoded per-line joint state and full joint sequence.

use serde::{Deserialize, Serialize};

use crate::boundary::{Boundary, EntityType};

/// A candidate (or decoded) joint assignment for one line: its boundary
/// label plus one field label per candidate span on that line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointState {
    /// `B` or `C`.
    pub boundary: Boundary,
    /// One label per span of the line (schema field name or the noise
    /// label), in the same order as the line's `LineSpans::spans`.
    pub fields: Vec<String>,
    /// Entity-type classification; only set (and only meaningful) when
    /// `boundary == Boundary::B`.
    pub entity_type: Option<EntityType>,
}

impl JointState {
    /// Construct a joint state with no entity type set.
    pub fn new(boundary: Boundary, fields: Vec<String>) -> Self {
        Self {
            boundary,
            fields,
            entity_type: None,
        }
    }
}

/// The decoded sequence of [`JointState`]s, one per document line.
pub type JointSequence = Vec<JointState>;
