//! Streaming driver (§4.7): iterates windows, advances to the next `B`
//! boundary, and threads a carry-over beam and optional feedback
//! constraints between windows.
//!
//! The driver is a plain [`Iterator`]: each call to `next` decodes one more
//! window and returns the decoded prefix up to (but not including) the
//! next discovered record boundary. It is restartable by constructing a
//! fresh [`StreamingDriver`] (§5) — there is no shared, process-lifetime
//! state to reset.

use std::collections::HashMap;

use recordlift_schema::FieldSchema;

use crate::boundary::Boundary;
use crate::cache::DecodeCaches;
use crate::constraints::ForcedConstraints;
use crate::dynamic::{DynamicCandidate, materialize_dynamic_features};
use crate::enumerate::EnumerateOptions;
use crate::error::DecodeError;
use crate::feedback::{Feedback, build_feedback_context};
use crate::features::Feature;
use crate::label_model::LabelModel;
use crate::lattice::{BeamEntry, decode_window};
use crate::span::LineSpans;
use crate::state::JointState;
use crate::weights::Weights;

/// Options controlling the streaming driver.
#[derive(Debug, Clone)]
pub struct StreamingOptions {
    /// Window length in lines. Default `32`.
    pub lookahead_lines: usize,
    /// Outgoing/carry beam width. Default `1`.
    pub beam: usize,
    /// Whether the outgoing beam of one window seeds the next. Default `true`.
    pub carryover: bool,
    /// User assertions to reconcile against the document before decoding.
    pub feedback: Option<Feedback>,
    /// File-level dynamic feature candidates (out of scope to produce; see
    /// [`crate::dynamic`]).
    pub dynamic_candidates: Option<Vec<DynamicCandidate>>,
    /// How many ranked dynamic candidates to materialise. Default `50`.
    pub dynamic_candidate_limit: usize,
    /// Seed weights for dynamic feature ids (`dyn:` prefix added
    /// automatically), only applied where no weight is already set.
    pub dynamic_initial_weights: Option<HashMap<String, f64>>,
}

impl Default for StreamingOptions {
    fn default() -> Self {
        Self {
            lookahead_lines: 32,
            beam: 1,
            carryover: true,
            feedback: None,
            dynamic_candidates: None,
            dynamic_candidate_limit: 50,
            dynamic_initial_weights: None,
        }
    }
}

/// One window's decoded output: the decoded prefix up to the next
/// discovered boundary, the corresponding slice of spans, and a confidence
/// reflecting whether a boundary was actually found within the window.
#[derive(Debug, Clone)]
pub struct WindowRecord {
    /// The decoded states for `[start_line, end_line]`.
    pub pred: Vec<JointState>,
    /// The spans for `[start_line, end_line]`, post-feedback-rewrite.
    pub spans_per_line: Vec<LineSpans>,
    /// First line of this window's prediction.
    pub start_line: usize,
    /// Last line of this window's prediction (inclusive).
    pub end_line: usize,
    /// `1.0` if a boundary was found inside the decoded window, `0.5`
    /// otherwise (the window ran out before the next record started).
    pub confidence: f64,
}

/// A restartable, lazy sequence of [`WindowRecord`]s over one document.
///
/// Construct with [`StreamingDriver::new`], then iterate. `lines` and
/// `schema` are borrowed for the driver's lifetime; `weights` and the
/// feature lists are consumed/cloned into owned state so dynamic features
/// and feedback-derived weight seeds can be folded in without touching the
/// caller's originals.
pub struct StreamingDriver<'a> {
    lines: &'a [String],
    schema: &'a FieldSchema,
    weights: Weights,
    label_model: &'a dyn LabelModel,
    opts: StreamingOptions,
    spans_per_line: Vec<LineSpans>,
    caches: DecodeCaches,
    pos: usize,
    carry_beam: Vec<BeamEntry>,
}

impl<'a> StreamingDriver<'a> {
    /// Build a driver: reconcile feedback (if any), materialise dynamic
    /// features (if any), build the document caches once, and start at
    /// line 0 with an empty carry beam.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        lines: &'a [String],
        spans_per_line: &[LineSpans],
        weights: &Weights,
        schema: &'a FieldSchema,
        mut boundary_features: Vec<Box<dyn Feature>>,
        mut segment_features: Vec<Box<dyn Feature>>,
        enumerate_opts: &EnumerateOptions,
        label_model: &'a dyn LabelModel,
        streaming_opts: &StreamingOptions,
    ) -> Result<Self, DecodeError> {
        let mut enumerate_opts = enumerate_opts.clone();
        let mut weights = weights.clone();
        let mut spans_per_line = spans_per_line.to_vec();
        let mut constraints = ForcedConstraints::default();

        if let Some(feedback) = &streaming_opts.feedback {
            let ctx = build_feedback_context(lines, &spans_per_line, feedback, schema)?;
            spans_per_line = ctx.spans_per_line;
            constraints = ctx.constraints;
            if let Some(max_idx) = constraints.max_asserted_span_idx {
                enumerate_opts.safe_prefix = enumerate_opts.safe_prefix.max(max_idx + 1);
            }
        }

        if let Some(candidates) = &streaming_opts.dynamic_candidates {
            let (dyn_boundary, dyn_segment) = materialize_dynamic_features(
                candidates,
                &spans_per_line,
                streaming_opts.dynamic_candidate_limit,
            );
            boundary_features.extend(dyn_boundary);
            segment_features.extend(dyn_segment);
            if let Some(initial) = &streaming_opts.dynamic_initial_weights {
                for (k, v) in initial {
                    weights.seed_if_absent(format!("dyn:{k}"), *v);
                }
            }
        }

        let caches = DecodeCaches::build(
            lines,
            &spans_per_line,
            &weights,
            schema,
            &boundary_features,
            &segment_features,
            &enumerate_opts,
            &constraints,
        )?;

        Ok(Self {
            lines,
            schema,
            weights,
            label_model,
            opts: streaming_opts.clone(),
            spans_per_line,
            caches,
            pos: 0,
            carry_beam: Vec::new(),
        })
    }

    /// The document caches built for this decode (post-feedback, post-dynamic
    /// features).
    pub fn caches(&self) -> &DecodeCaches {
        &self.caches
    }

    /// The spans this driver is decoding against, after any feedback-driven
    /// span insertion.
    pub fn spans_per_line(&self) -> &[LineSpans] {
        &self.spans_per_line
    }

    /// The weights this driver is decoding with, after any dynamic-feature
    /// weight seeding.
    pub fn weights(&self) -> &Weights {
        &self.weights
    }
}

impl Iterator for StreamingDriver<'_> {
    type Item = WindowRecord;

    fn next(&mut self) -> Option<WindowRecord> {
        if self.pos >= self.lines.len() {
            return None;
        }
        let end_exclusive = (self.pos + self.opts.lookahead_lines).min(self.lines.len());
        if end_exclusive <= self.pos {
            return None;
        }

        let result = decode_window(
            self.lines,
            &self.caches,
            self.schema,
            &self.weights,
            self.label_model,
            self.pos,
            end_exclusive,
            &self.carry_beam,
            self.opts.beam,
        );

        let found_at = result
            .path
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, s)| matches!(s.boundary, Boundary::B))
            .map(|(i, _)| i);

        let (pred_len, confidence) = match found_at {
            Some(i) => (i, 1.0),
            None => (result.path.len(), 0.5),
        };

        let start_line = self.pos;
        let end_line = start_line + pred_len - 1;
        let pred = result.path[..pred_len].to_vec();
        let spans_per_line = self.spans_per_line[start_line..=end_line].to_vec();
        let new_pos = start_line + pred_len;

        self.carry_beam = if self.opts.carryover && self.opts.beam > 1 {
            result.outgoing_beam
        } else {
            Vec::new()
        };

        if new_pos <= self.pos {
            // NonProgress guard (§7): never observed given pred_len >= 1,
            // but stop cleanly rather than livelock if it ever is.
            self.pos = self.lines.len();
            return None;
        }
        self.pos = new_pos;

        Some(WindowRecord {
            pred,
            spans_per_line,
            start_line,
            end_line,
            confidence,
        })
    }
}

/// Run the streaming driver to completion with `lookaheadLines` set to the
/// whole document, concatenate its window predictions into one joint
/// sequence, and assemble the result into [`crate::assemble::RecordSpan`]s.
///
/// Equivalent, per §4.7, to `decodeJointSequence` followed by
/// `assembleRecords` — but produced by the same window/boundary-discovery
/// loop the incremental streaming caller uses, so the two paths can never
/// silently diverge.
#[allow(clippy::too_many_arguments)]
pub fn decode_full_via_streaming(
    lines: &[String],
    spans_per_line: &[LineSpans],
    weights: &Weights,
    schema: &FieldSchema,
    boundary_features: Vec<Box<dyn Feature>>,
    segment_features: Vec<Box<dyn Feature>>,
    enumerate_opts: &EnumerateOptions,
    label_model: &dyn LabelModel,
    streaming_opts: &StreamingOptions,
) -> Result<Vec<crate::assemble::RecordSpan>, DecodeError> {
    let mut opts = streaming_opts.clone();
    opts.lookahead_lines = lines.len().max(1);

    let mut driver = StreamingDriver::new(
        lines,
        spans_per_line,
        weights,
        schema,
        boundary_features,
        segment_features,
        enumerate_opts,
        label_model,
        &opts,
    )?;

    let mut joint_seq = Vec::with_capacity(lines.len());
    while let Some(window) = driver.next() {
        joint_seq.extend(window.pred);
    }

    Ok(crate::assemble::assemble_records(
        lines,
        driver.spans_per_line(),
        &joint_seq,
        driver.caches(),
        driver.weights(),
        schema,
        label_model,
    ))
}
