//! Feature/emission cache: precomputes per-document data once so the
//! lattice decoder never re-evaluates a feature function twice.

use std::collections::HashMap;

use recordlift_diagnostics::Diagnostic;
use recordlift_schema::FieldSchema;

use crate::constraints::ForcedConstraints;
use crate::enumerate::{EnumerateOptions, enumerate_line_states};
use crate::error::DecodeError;
use crate::features::{Feature, FeatureContext};
use crate::span::{LineSpans, Span, span_text};
use crate::state::JointState;

/// Owned, per-decode caches: `boundaryBase`, `spanFeatures`, `spanText`, and
/// `stateSpaces`, plus the set of lines where enumeration hit `maxStates`
/// (the soft `CapacityExhausted` condition — never raised, only recorded).
///
/// Built once per document per feature set; discarded at the end of the
/// decode call that constructed it (`crate::decode::decode_joint_sequence`,
/// `crate::streaming::StreamingDriver::new`). No shared mutation: every
/// field here is read-only once construction finishes.
#[derive(Debug, Clone)]
pub struct DecodeCaches {
    boundary_base: Vec<f64>,
    span_features: Vec<Vec<HashMap<String, f64>>>,
    span_text: Vec<Vec<String>>,
    state_spaces: Vec<Vec<JointState>>,
    capacity_exhausted_lines: Vec<usize>,
}

/// Validate that `spans_per_line` is shape- and range-consistent with
/// `lines`: one entry per line, in line order, with every span obeying
/// `0 <= start < end <= line.len()`.
pub fn validate_spans(lines: &[String], spans_per_line: &[LineSpans]) -> Result<(), DecodeError> {
    if spans_per_line.len() != lines.len() {
        return Err(DecodeError::InvalidSpans {
            reason: format!(
                "spansPerLine has {} entries but there are {} lines",
                spans_per_line.len(),
                lines.len()
            ),
        });
    }
    for (i, (line, line_spans)) in lines.iter().zip(spans_per_line).enumerate() {
        if line_spans.line_index != i {
            return Err(DecodeError::InvalidSpans {
                reason: format!(
                    "spansPerLine[{i}] has line_index {} but belongs at position {i}",
                    line_spans.line_index
                ),
            });
        }
        for span in &line_spans.spans {
            if span.end <= span.start {
                return Err(DecodeError::InvalidSpans {
                    reason: format!(
                        "line {i}: span [{}, {}) has end <= start",
                        span.start, span.end
                    ),
                });
            }
            if span.end > line.len() {
                return Err(DecodeError::InvalidSpans {
                    reason: format!(
                        "line {i}: span [{}, {}) exceeds line length {}",
                        span.start,
                        span.end,
                        line.len()
                    ),
                });
            }
        }
    }
    Ok(())
}

impl DecodeCaches {
    /// Build the full set of per-document caches.
    ///
    /// `boundary_features`/`segment_features` are evaluated once per
    /// line/span respectively; `opts` and `constraints` drive per-line
    /// enumeration exactly as described in the enumerator's own contract.
    pub fn build(
        lines: &[String],
        spans_per_line: &[LineSpans],
        weights: &crate::weights::Weights,
        schema: &FieldSchema,
        boundary_features: &[Box<dyn Feature>],
        segment_features: &[Box<dyn Feature>],
        opts: &EnumerateOptions,
        constraints: &ForcedConstraints,
    ) -> Result<Self, DecodeError> {
        validate_spans(lines, spans_per_line)?;

        let n = lines.len();
        let mut boundary_base = Vec::with_capacity(n);
        let mut span_features = Vec::with_capacity(n);
        let mut span_text_cache = Vec::with_capacity(n);
        let mut state_spaces = Vec::with_capacity(n);
        let mut capacity_exhausted_lines = Vec::new();

        for (i, (line, line_spans)) in lines.iter().zip(spans_per_line).enumerate() {
            let line_ctx = FeatureContext::line(lines, i);
            let base: f64 = boundary_features
                .iter()
                .map(|f| weights.get(f.id()) * f.apply(&line_ctx))
                .sum();
            boundary_base.push(base);

            let mut feats_for_line = Vec::with_capacity(line_spans.spans.len());
            let mut texts_for_line = Vec::with_capacity(line_spans.spans.len());
            for &span in &line_spans.spans {
                let text = span_text(line, span).to_string();
                let span_ctx = FeatureContext::span(lines, i, span, &text);
                let feats: HashMap<String, f64> = segment_features
                    .iter()
                    .map(|f| (f.id().to_string(), f.apply(&span_ctx)))
                    .collect();
                feats_for_line.push(feats);
                texts_for_line.push(text);
            }

            let forced_labels = constraints.labels_for_line(i);
            let forced_boundary = constraints.boundary_for_line(i);
            let forced_entity_type = constraints.entity_type_for_line(i);

            let spans: Vec<Span> = line_spans.spans.clone();
            let result = enumerate_line_states(
                &spans,
                line,
                &feats_for_line,
                schema,
                opts,
                forced_labels,
                forced_boundary,
                forced_entity_type,
            );
            if result.truncated {
                capacity_exhausted_lines.push(i);
            }

            span_features.push(feats_for_line);
            span_text_cache.push(texts_for_line);
            state_spaces.push(result.states);
        }

        Ok(Self {
            boundary_base,
            span_features,
            span_text: span_text_cache,
            state_spaces,
            capacity_exhausted_lines,
        })
    }

    /// Number of lines this cache covers.
    pub fn line_count(&self) -> usize {
        self.boundary_base.len()
    }

    /// The unsigned boundary base score for `line` (§4.5): the sign is
    /// applied by the caller depending on the candidate's boundary.
    pub fn boundary_base(&self, line: usize) -> f64 {
        self.boundary_base[line]
    }

    /// Per-span feature maps for `line`, in span order.
    pub fn span_features(&self, line: usize) -> &[HashMap<String, f64>] {
        &self.span_features[line]
    }

    /// Per-span cached text for `line`, in span order.
    pub fn span_text(&self, line: usize) -> &[String] {
        &self.span_text[line]
    }

    /// The enumerated candidate states for `line`.
    pub fn state_spaces(&self, line: usize) -> &[JointState] {
        &self.state_spaces[line]
    }

    /// Lines where enumeration hit `maxStates` before exhausting the real
    /// search space (the soft `CapacityExhausted` condition).
    pub fn capacity_exhausted_lines(&self) -> &[usize] {
        &self.capacity_exhausted_lines
    }

    /// [`capacity_exhausted_lines`](Self::capacity_exhausted_lines) rendered
    /// as structured [`Diagnostic`]s, for callers that want a reportable
    /// form of the same soft condition rather than a bare line-index list.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.capacity_exhausted_lines
            .iter()
            .map(|&line| {
                Diagnostic::warn(
                    "capacity_exhausted",
                    "line state enumeration hit maxStates before exhausting the search space",
                    Some(line),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{default_boundary_features, default_segment_features};
    use crate::span::Span;
    use crate::weights::Weights;
    use recordlift_schema::presets::household;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rejects_length_mismatch() {
        let lines = lines(&["a", "b"]);
        let spans = vec![LineSpans::new(0, vec![])];
        let err = validate_spans(&lines, &spans).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidSpans { .. }));
    }

    #[test]
    fn rejects_out_of_range_span() {
        let lines = lines(&["abc"]);
        let spans = vec![LineSpans::new(0, vec![Span::new(0, 10)])];
        let err = validate_spans(&lines, &spans).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidSpans { .. }));
    }

    #[test]
    fn builds_caches_for_simple_document() {
        let lines = lines(&["Henry Johnson\t45NUMBEU"]);
        let spans = vec![LineSpans::new(0, vec![Span::new(0, 13), Span::new(14, 22)])];
        let schema = household();
        let weights = Weights::new();
        let opts = EnumerateOptions::default();
        let caches = DecodeCaches::build(
            &lines,
            &spans,
            &weights,
            &schema,
            &default_boundary_features(),
            &default_segment_features(),
            &opts,
            &ForcedConstraints::default(),
        )
        .unwrap();
        assert_eq!(caches.line_count(), 1);
        assert_eq!(caches.span_text(0), &["Henry Johnson", "45NUMBEU"]);
        assert!(!caches.state_spaces(0).is_empty());
        assert!(caches.capacity_exhausted_lines().is_empty());
        assert!(caches.diagnostics().is_empty());
    }

    #[test]
    fn diagnostics_mirror_capacity_exhausted_lines() {
        let text: String = (0..20).map(|_| "ab ").collect();
        let lines_vec = lines(&[text.trim_end()]);
        let spans_vec: Vec<Span> = (0..20).map(|i| Span::new(i * 3, i * 3 + 2)).collect();
        let spans = vec![LineSpans::new(0, spans_vec)];
        let schema = household();
        let weights = Weights::new();
        let mut opts = EnumerateOptions::default();
        opts.max_states = 10;
        opts.safe_prefix = 20;
        let caches = DecodeCaches::build(
            &lines_vec,
            &spans,
            &weights,
            &schema,
            &default_boundary_features(),
            &default_segment_features(),
            &opts,
            &ForcedConstraints::default(),
        )
        .unwrap();
        assert_eq!(caches.capacity_exhausted_lines(), &[0]);
        let diags = caches.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].line, Some(0));
        assert_eq!(diags[0].id, "capacity_exhausted");
    }
}
