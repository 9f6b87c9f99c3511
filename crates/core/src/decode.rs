//! Full-document joint decode entry point.
//!
//! A thin wrapper over the cache builder and the windowed lattice decoder
//! (§4.6): it decodes the entire document as a single window, with no
//! carry-over beam, no feedback, and no dynamic features. Callers that need
//! any of those reach for [`crate::streaming::StreamingDriver`] instead,
//! which this module's sibling, [`crate::streaming::decode_full_via_streaming`],
//! is built on.

use recordlift_schema::FieldSchema;

use crate::cache::DecodeCaches;
use crate::constraints::ForcedConstraints;
use crate::enumerate::EnumerateOptions;
use crate::error::DecodeError;
use crate::features::Feature;
use crate::label_model::LabelModel;
use crate::lattice::decode_window;
use crate::span::LineSpans;
use crate::state::JointSequence;
use crate::weights::Weights;

/// Decode `lines` in one shot: build caches, then run the windowed lattice
/// decoder (§4.6) over `[0, lines.len())` with no incoming beam.
///
/// Returns `len(result) == lines.len()` for any input that passes span
/// validation (invariant 1, §8).
#[allow(clippy::too_many_arguments)]
pub fn decode_joint_sequence(
    lines: &[String],
    spans_per_line: &[LineSpans],
    weights: &Weights,
    schema: &FieldSchema,
    boundary_features: &[Box<dyn Feature>],
    segment_features: &[Box<dyn Feature>],
    opts: &EnumerateOptions,
    label_model: &dyn LabelModel,
) -> Result<JointSequence, DecodeError> {
    let caches = DecodeCaches::build(
        lines,
        spans_per_line,
        weights,
        schema,
        boundary_features,
        segment_features,
        opts,
        &ForcedConstraints::default(),
    )?;
    let result = decode_window(
        lines,
        &caches,
        schema,
        weights,
        label_model,
        0,
        lines.len(),
        &[],
        1,
    );
    Ok(result.path)
}
