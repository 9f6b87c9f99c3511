//! Feedback context builder (§4.8): turns user assertions into forced
//! labels/boundaries/entity types and span insertions.

use std::collections::HashMap;

use recordlift_diagnostics::LineOffsets;
use recordlift_schema::FieldSchema;
use serde::{Deserialize, Serialize};

use crate::boundary::{Boundary, EntityType};
use crate::constraints::ForcedConstraints;
use crate::error::DecodeError;
use crate::span::{LineSpans, Span};

/// Whether a field assertion adds a forced label or removes one (forcing
/// the noise label instead).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldAction {
    /// Force the span to `field_type`.
    Add,
    /// Force the span to the schema's noise label.
    Remove,
}

/// One user assertion. Modelled as a tagged sum type (not inheritance) so
/// the context builder can match it exhaustively (§9 re-architecture note).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedbackEntry {
    /// Asserts that lines `[start_line, end_line]` form one record.
    Record {
        /// First line of the asserted record.
        start_line: usize,
        /// Last line of the asserted record (inclusive).
        end_line: usize,
    },
    /// Asserts that the file range `[file_start, file_end)` is one entity
    /// of the given type.
    Entity {
        /// File-relative start offset of the entity.
        file_start: usize,
        /// File-relative end offset of the entity (exclusive).
        file_end: usize,
        /// The asserted entity type.
        entity_type: EntityType,
    },
    /// Asserts (or retracts) a field label on a specific line-relative span.
    Field {
        /// Whether this assertion adds or removes the label.
        action: FieldAction,
        /// The line this span belongs to.
        line_index: usize,
        /// Line-relative start offset.
        start: usize,
        /// Line-relative end offset.
        end: usize,
        /// The asserted field label (ignored for `Remove`, which always
        /// forces the schema's noise label).
        field_type: String,
        /// Optional user-supplied confidence, carried for callers; the
        /// decoder itself does not consume it.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        confidence: Option<f64>,
    },
}

/// A batch of user assertions over one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Feedback {
    /// The assertions, applied in order (later entries win on conflict).
    pub entries: Vec<FeedbackEntry>,
}

/// The result of reconciling feedback against a document: a (possibly)
/// rewritten copy of `spans_per_line` plus the derived forced constraints.
#[derive(Debug, Clone)]
pub struct FeedbackContext {
    /// `spans_per_line`, deep-copied and augmented with assertion-aligned
    /// spans. The caller's original `spans_per_line` is never mutated.
    pub spans_per_line: Vec<LineSpans>,
    /// Forced labels/boundaries/entity types derived from `feedback`.
    pub constraints: ForcedConstraints,
}

fn insert_span_if_missing(line_spans: &mut LineSpans, span: Span) -> usize {
    match line_spans
        .spans
        .binary_search_by_key(&(span.start, span.end), |s| (s.start, s.end))
    {
        Ok(idx) => idx,
        Err(_) => {
            line_spans.spans.push(span);
            line_spans.spans.sort_by_key(|s| (s.start, s.end));
            line_spans
                .spans
                .binary_search_by_key(&(span.start, span.end), |s| (s.start, s.end))
                .expect("span was just inserted")
        }
    }
}

/// Build a [`FeedbackContext`] from `feedback` against the current document
/// state. Returns `InvalidFeedback` for a field assertion with
/// `start >= end`, an out-of-range `line_index`, or an entity assertion
/// whose file range intersects no line.
pub fn build_feedback_context(
    lines: &[String],
    spans_per_line: &[LineSpans],
    feedback: &Feedback,
    schema: &FieldSchema,
) -> Result<FeedbackContext, DecodeError> {
    let line_offsets = LineOffsets::from_line_lengths(lines.iter().map(String::len));
    let mut spans_per_line = spans_per_line.to_vec();
    let mut constraints = ForcedConstraints::default();
    let mut max_asserted_span_idx: Option<usize> = None;

    let mut touch = |line: usize, start: usize, end: usize, idx_max: &mut Option<usize>| {
        let idx = insert_span_if_missing(&mut spans_per_line[line], Span::new(start, end));
        *idx_max = Some(idx_max.map_or(idx, |cur| cur.max(idx)));
    };

    for entry in &feedback.entries {
        match entry {
            FeedbackEntry::Record {
                start_line,
                end_line,
            } => {
                if *start_line >= lines.len() || *end_line >= lines.len() || start_line > end_line
                {
                    return Err(DecodeError::InvalidFeedback {
                        reason: format!(
                            "record assertion [{start_line}, {end_line}] out of range for {} lines",
                            lines.len()
                        ),
                    });
                }
                constraints
                    .boundaries_by_line
                    .insert(*start_line, Boundary::B);
                for line in (start_line + 1)..=*end_line {
                    constraints.boundaries_by_line.insert(line, Boundary::C);
                }
            }
            FeedbackEntry::Entity {
                file_start,
                file_end,
                entity_type,
            } => {
                if file_end <= file_start {
                    return Err(DecodeError::InvalidFeedback {
                        reason: format!(
                            "entity assertion [{file_start}, {file_end}) has end <= start"
                        ),
                    });
                }
                let assertion_span = Span::new(*file_start, *file_end);
                let mut touched_any_line = false;
                let mut first_touched_line: Option<usize> = None;
                for line in 0..lines.len() {
                    let Some(line_span) = line_offsets.line_span(line) else {
                        continue;
                    };
                    let file_line_span = Span::new(line_span.start, line_span.end);
                    let Some(inter) = assertion_span.intersect(&file_line_span) else {
                        continue;
                    };
                    touched_any_line = true;
                    let local_start = inter.start - line_span.start;
                    let local_end = inter.end - line_span.start;
                    if local_end > local_start {
                        touch(line, local_start, local_end, &mut max_asserted_span_idx);
                    }
                    let first = *first_touched_line.get_or_insert(line);
                    if line == first {
                        constraints.boundaries_by_line.insert(line, Boundary::B);
                        constraints.entity_type_by_line.insert(line, *entity_type);
                    } else {
                        constraints.boundaries_by_line.insert(line, Boundary::C);
                    }
                }
                if !touched_any_line {
                    return Err(DecodeError::InvalidFeedback {
                        reason: format!(
                            "entity assertion [{file_start}, {file_end}) intersects no line"
                        ),
                    });
                }
            }
            FeedbackEntry::Field {
                action,
                line_index,
                start,
                end,
                field_type,
                confidence: _,
            } => {
                if *line_index >= lines.len() {
                    return Err(DecodeError::InvalidFeedback {
                        reason: format!(
                            "field assertion line_index {line_index} out of range for {} lines",
                            lines.len()
                        ),
                    });
                }
                if end <= start {
                    return Err(DecodeError::InvalidFeedback {
                        reason: format!("field assertion [{start}, {end}) has end <= start"),
                    });
                }
                touch(*line_index, *start, *end, &mut max_asserted_span_idx);
                let label = match action {
                    FieldAction::Add => field_type.clone(),
                    FieldAction::Remove => schema.noise_label().to_string(),
                };
                constraints
                    .labels_by_line
                    .entry(*line_index)
                    .or_default()
                    .insert((*start, *end), label);
            }
        }
    }

    constraints.max_asserted_span_idx = max_asserted_span_idx;

    Ok(FeedbackContext {
        spans_per_line,
        constraints,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use recordlift_schema::presets::household;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn field_add_forces_label_and_inserts_span() {
        let doc = lines(&["Foo Bar"]);
        let spans = vec![LineSpans::new(0, vec![])];
        let schema = household();
        let feedback = Feedback {
            entries: vec![FeedbackEntry::Field {
                action: FieldAction::Add,
                line_index: 0,
                start: 0,
                end: 3,
                field_type: "Name".to_string(),
                confidence: None,
            }],
        };
        let ctx = build_feedback_context(&doc, &spans, &feedback, &schema).unwrap();
        assert_eq!(ctx.spans_per_line[0].spans, vec![Span::new(0, 3)]);
        assert_eq!(
            ctx.constraints.labels_for_line(0).unwrap().get(&(0, 3)),
            Some(&"Name".to_string())
        );
        assert_eq!(ctx.constraints.max_asserted_span_idx, Some(0));
    }

    #[test]
    fn field_remove_forces_noise_label() {
        let doc = lines(&["5551234567"]);
        let spans = vec![LineSpans::new(0, vec![Span::new(0, 10)])];
        let schema = household();
        let feedback = Feedback {
            entries: vec![FeedbackEntry::Field {
                action: FieldAction::Remove,
                line_index: 0,
                start: 0,
                end: 10,
                field_type: "Phone".to_string(),
                confidence: None,
            }],
        };
        let ctx = build_feedback_context(&doc, &spans, &feedback, &schema).unwrap();
        assert_eq!(
            ctx.constraints.labels_for_line(0).unwrap().get(&(0, 10)),
            Some(&"NOISE".to_string())
        );
    }

    #[test]
    fn later_entry_wins_on_conflict() {
        let doc = lines(&["Foo Bar"]);
        let spans = vec![LineSpans::new(0, vec![Span::new(0, 3)])];
        let schema = household();
        let feedback = Feedback {
            entries: vec![
                FeedbackEntry::Field {
                    action: FieldAction::Add,
                    line_index: 0,
                    start: 0,
                    end: 3,
                    field_type: "Name".to_string(),
                    confidence: None,
                },
                FeedbackEntry::Field {
                    action: FieldAction::Add,
                    line_index: 0,
                    start: 0,
                    end: 3,
                    field_type: "PreferredName".to_string(),
                    confidence: None,
                },
            ],
        };
        let ctx = build_feedback_context(&doc, &spans, &feedback, &schema).unwrap();
        assert_eq!(
            ctx.constraints.labels_for_line(0).unwrap().get(&(0, 3)),
            Some(&"PreferredName".to_string())
        );
    }

    #[test]
    fn entity_assertion_forces_boundaries_across_lines() {
        let doc = lines(&["A", "B", "C", "D"]);
        let spans: Vec<LineSpans> = (0..4).map(|i| LineSpans::new(i, vec![])).collect();
        let schema = household();
        // file offsets: "A\n" -> 0-1, "B\n" -> 2-3, "C\n" -> 4-5, "D" -> 6-7
        let feedback = Feedback {
            entries: vec![FeedbackEntry::Entity {
                file_start: 2,
                file_end: 6,
                entity_type: EntityType::Guardian,
            }],
        };
        let ctx = build_feedback_context(&doc, &spans, &feedback, &schema).unwrap();
        assert_eq!(ctx.constraints.boundary_for_line(1), Some(Boundary::B));
        assert_eq!(ctx.constraints.boundary_for_line(2), Some(Boundary::C));
        assert_eq!(
            ctx.constraints.entity_type_for_line(1),
            Some(EntityType::Guardian)
        );
    }

    #[test]
    fn entity_assertion_outside_document_errors() {
        let doc = lines(&["A"]);
        let spans = vec![LineSpans::new(0, vec![])];
        let schema = household();
        let feedback = Feedback {
            entries: vec![FeedbackEntry::Entity {
                file_start: 100,
                file_end: 200,
                entity_type: EntityType::Primary,
            }],
        };
        let err = build_feedback_context(&doc, &spans, &feedback, &schema).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidFeedback { .. }));
    }

    #[test]
    fn field_assertion_with_inverted_range_errors() {
        let doc = lines(&["Foo"]);
        let spans = vec![LineSpans::new(0, vec![])];
        let schema = household();
        let feedback = Feedback {
            entries: vec![FeedbackEntry::Field {
                action: FieldAction::Add,
                line_index: 0,
                start: 3,
                end: 1,
                field_type: "Name".to_string(),
                confidence: None,
            }],
        };
        let err = build_feedback_context(&doc, &spans, &feedback, &schema).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidFeedback { .. }));
    }
}
