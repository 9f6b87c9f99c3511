//! Feature-weighted joint Viterbi decoder for extracting structured records
//! from semi-structured free-form text.
//!
//! Given a document's lines, the byte spans already segmented within each
//! line, a field schema, and a tunable [`Weights`] vector, this crate
//! jointly decodes, per line, a record/entity `Boundary` and a field label
//! for every span — then folds that sequence into `Record -> Entity ->
//! Field` spans with confidence scores. [`decode_joint_sequence`] decodes a
//! whole document in one shot; [`StreamingDriver`] does the same
//! incrementally, windowed, with an optional carry-over beam and user
//! feedback reconciliation.

#![warn(missing_docs)]

/// Record/entity assembly: folds a decoded joint sequence into spans.
pub mod assemble;
/// The `Boundary` and `EntityType` enums shared across the crate.
pub mod boundary;
/// Per-document caches of boundary/span feature values built once per decode.
pub mod cache;
/// Hard constraints derived from reconciled user feedback.
pub mod constraints;
/// The full-document, single-window decode entry point.
pub mod decode;
/// Materialisation of file-level dynamic features into `dyn:`-prefixed
/// [`features::Feature`] values.
pub mod dynamic;
/// The entity-type annotator and its orphan-guardian demotion pass.
pub mod entity_type;
/// Per-line enumeration of joint (boundary, field-labels) candidate states.
pub mod enumerate;
/// The crate's error type.
pub mod error;
/// User feedback entries and their reconciliation into spans/constraints.
pub mod feedback;
/// The `Feature` trait and the built-in boundary/segment feature set.
pub mod features;
/// The `LabelModel` trait and its default asymmetric scoring scheme.
pub mod label_model;
/// The windowed lattice (Viterbi) decoder.
pub mod lattice;
/// Streaming, windowed decode driver.
pub mod streaming;
/// Byte-span helpers local to a single line.
pub mod span;
/// The per-line joint state and joint sequence types.
pub mod state;
/// The tunable feature weight vector.
pub mod weights;

// ── Convenience re-exports ──────────────────────────────────────────────────
// Flat imports for the most common entry points. The full module paths
// remain available for less common types.

pub use assemble::{EntitySpan, FieldSpan, RecordSpan, assemble_records};
pub use boundary::{Boundary, EntityType};
pub use cache::DecodeCaches;
pub use constraints::ForcedConstraints;
pub use decode::decode_joint_sequence;
pub use dynamic::{DynamicCandidate, DynamicFeature, materialize_dynamic_features};
pub use entity_type::annotate_entity_types;
pub use enumerate::{EnumerateOptions, EnumerationResult, enumerate_line_states};
pub use error::DecodeError;
pub use feedback::{Feedback, FeedbackContext, FeedbackEntry, FieldAction, build_feedback_context};
pub use features::{Feature, FeatureContext, default_boundary_features, default_segment_features};
pub use label_model::{DefaultLabelModel, LabelModel};
pub use lattice::{BeamEntry, WindowDecodeResult, decode_window};
pub use span::{LineSpans, Span, is_whitespace_only};
pub use state::{JointSequence, JointState};
pub use streaming::{StreamingDriver, StreamingOptions, WindowRecord, decode_full_via_streaming};
pub use weights::{Weights, WeightsError};

pub use recordlift_diagnostics::{ByteSpan, Diagnostic, LineOffsets, Severity};
pub use recordlift_schema::{FieldConfig, FieldSchema, SchemaError};
