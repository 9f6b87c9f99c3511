//! Record assembler (§4.9): folds a decoded joint sequence into
//! `Record → Entity → Field`, with file-relative and entity-relative
//! offsets plus per-span softmax confidence.

use std::collections::HashMap;

use recordlift_diagnostics::LineOffsets;
use recordlift_schema::FieldSchema;
use serde::{Deserialize, Serialize};

use crate::boundary::{Boundary, EntityType};
use crate::cache::DecodeCaches;
use crate::entity_type::annotate_entity_types;
use crate::label_model::LabelModel;
use crate::span::LineSpans;
use crate::state::JointState;
use crate::weights::Weights;

/// A single labelled span within one line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldSpan {
    /// The line this field's span belongs to.
    pub line_index: usize,
    /// Line-relative start offset.
    pub start: usize,
    /// Line-relative end offset.
    pub end: usize,
    /// File-relative start offset (`line_start + start`).
    pub file_start: usize,
    /// File-relative end offset.
    pub file_end: usize,
    /// Offset relative to the owning entity's `file_start`.
    pub entity_start: usize,
    /// Offset relative to the owning entity's `file_start`.
    pub entity_end: usize,
    /// The assigned schema field label (never the noise label — noise
    /// spans are not emitted as fields).
    pub field_type: String,
    /// Softmax confidence over all candidate labels for this span, in
    /// `[0, 1]`.
    pub confidence: f64,
}

/// A contiguous run of lines sharing one entity type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntitySpan {
    /// First line of the entity.
    pub start_line: usize,
    /// Last line of the entity (inclusive).
    pub end_line: usize,
    /// File-relative start offset.
    pub file_start: usize,
    /// File-relative end offset.
    pub file_end: usize,
    /// The entity's classified type.
    pub entity_type: EntityType,
    /// Fields on this entity's lines, ordered by `file_start`.
    pub fields: Vec<FieldSpan>,
}

/// One assembled record: one or more contiguous entities starting on a
/// `B`-boundary line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordSpan {
    /// First line of the record.
    pub start_line: usize,
    /// Last line of the record (inclusive).
    pub end_line: usize,
    /// File-relative start offset.
    pub file_start: usize,
    /// File-relative end offset.
    pub file_end: usize,
    /// This record's entities, ordered by `file_start`.
    pub entities: Vec<EntitySpan>,
}

fn softmax_confidence(
    decoded_label: &str,
    text: &str,
    feats: &HashMap<String, f64>,
    weights: &Weights,
    schema: &FieldSchema,
    label_model: &dyn LabelModel,
) -> f64 {
    let mut labels: Vec<&str> = schema.labels().collect();
    labels.push(schema.noise_label());
    let scores: Vec<f64> = labels
        .iter()
        .map(|l| label_model.score_span_label(l, text, feats, weights, schema))
        .collect();
    let max_score = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp_scores: Vec<f64> = scores.iter().map(|s| (s - max_score).exp()).collect();
    let sum: f64 = exp_scores.iter().sum();
    let idx = labels
        .iter()
        .position(|&l| l == decoded_label)
        .unwrap_or(labels.len() - 1);
    if sum <= 0.0 {
        0.0
    } else {
        exp_scores[idx] / sum
    }
}

fn line_has_only_noise(state: &JointState, schema: &FieldSchema) -> bool {
    state.fields.iter().all(|f| f == schema.noise_label())
}

/// Fold a decoded `joint_seq` (one state per line) into assembled records.
///
/// If no state in `joint_seq` carries an `entity_type`, the entity-type
/// annotator (§4.10) is run first on a local copy; `joint_seq` itself is
/// never mutated.
#[allow(clippy::too_many_arguments)]
pub fn assemble_records(
    lines: &[String],
    spans_per_line: &[LineSpans],
    joint_seq: &[JointState],
    caches: &DecodeCaches,
    weights: &Weights,
    schema: &FieldSchema,
    label_model: &dyn LabelModel,
) -> Vec<RecordSpan> {
    let mut joint_seq = joint_seq.to_vec();
    if joint_seq.iter().all(|s| s.entity_type.is_none()) {
        annotate_entity_types(lines, &mut joint_seq);
    }

    let line_offsets = LineOffsets::from_line_lengths(lines.iter().map(String::len));

    let b_lines: Vec<usize> = joint_seq
        .iter()
        .enumerate()
        .filter(|(_, s)| matches!(s.boundary, Boundary::B))
        .map(|(i, _)| i)
        .collect();

    let mut records = Vec::new();
    for (ri, &start_line) in b_lines.iter().enumerate() {
        let end_line = b_lines
            .get(ri + 1)
            .map(|&next| next - 1)
            .unwrap_or(lines.len() - 1);

        let entities = assemble_entities_for_record(
            start_line,
            end_line,
            lines,
            spans_per_line,
            &joint_seq,
            caches,
            weights,
            schema,
            label_model,
            &line_offsets,
        );
        if entities.is_empty() {
            continue;
        }
        let file_start = entities.iter().map(|e| e.file_start).min().unwrap();
        let file_end = entities.iter().map(|e| e.file_end).max().unwrap();
        let record_start_line = entities.iter().map(|e| e.start_line).min().unwrap();
        let record_end_line = entities.iter().map(|e| e.end_line).max().unwrap();
        records.push(RecordSpan {
            start_line: record_start_line,
            end_line: record_end_line,
            file_start,
            file_end,
            entities,
        });
    }

    records
}

#[allow(clippy::too_many_arguments)]
fn assemble_entities_for_record(
    start_line: usize,
    end_line: usize,
    lines: &[String],
    spans_per_line: &[LineSpans],
    joint_seq: &[JointState],
    caches: &DecodeCaches,
    weights: &Weights,
    schema: &FieldSchema,
    label_model: &dyn LabelModel,
    line_offsets: &LineOffsets,
) -> Vec<EntitySpan> {
    let mut entities = Vec::new();
    let mut current_type: Option<EntityType> = None;
    let mut run_lines: Vec<usize> = Vec::new();

    let mut flush = |run_lines: &mut Vec<usize>, entity_type: EntityType, out: &mut Vec<EntitySpan>| {
        if run_lines.is_empty() {
            return;
        }
        let included: Vec<usize> = run_lines
            .iter()
            .copied()
            .filter(|&line| {
                !(entity_type == EntityType::Unknown
                    && line_has_only_noise(&joint_seq[line], schema))
            })
            .collect();
        run_lines.clear();
        if included.is_empty() {
            return;
        }
        let entity_start_line = *included.iter().min().unwrap();
        let entity_end_line = *included.iter().max().unwrap();
        let file_start = line_offsets.line_start(entity_start_line).unwrap();
        let file_end = line_offsets.line_end(entity_end_line).unwrap();

        let mut fields = Vec::new();
        for &line in &included {
            let line_start = line_offsets.line_start(line).unwrap();
            let spans = &spans_per_line[line].spans;
            let span_feats = caches.span_features(line);
            let span_text = caches.span_text(line);
            for (k, span) in spans.iter().enumerate() {
                let label = &joint_seq[line].fields[k];
                if label == schema.noise_label() {
                    continue;
                }
                let confidence = softmax_confidence(
                    label,
                    &span_text[k],
                    &span_feats[k],
                    weights,
                    schema,
                    label_model,
                );
                let field_file_start = line_start + span.start;
                let field_file_end = line_start + span.end;
                fields.push(FieldSpan {
                    line_index: line,
                    start: span.start,
                    end: span.end,
                    file_start: field_file_start,
                    file_end: field_file_end,
                    entity_start: field_file_start - file_start,
                    entity_end: field_file_end - file_start,
                    field_type: label.clone(),
                    confidence,
                });
            }
        }

        out.push(EntitySpan {
            start_line: entity_start_line,
            end_line: entity_end_line,
            file_start,
            file_end,
            entity_type,
            fields,
        });
    };

    for line in start_line..=end_line {
        let state = &joint_seq[line];
        let line_type = match state.boundary {
            Boundary::B => {
                let t = state.entity_type.unwrap_or(EntityType::Unknown);
                if current_type != Some(t) {
                    flush(&mut run_lines, current_type.unwrap_or(t), &mut entities);
                }
                current_type = Some(t);
                t
            }
            Boundary::C => current_type.unwrap_or(EntityType::Unknown),
        };
        run_lines.push(line);
        let _ = line_type;
    }
    if let Some(t) = current_type {
        flush(&mut run_lines, t, &mut entities);
    }

    entities
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::ForcedConstraints;
    use crate::enumerate::EnumerateOptions;
    use crate::features::{default_boundary_features, default_segment_features};
    use crate::label_model::DefaultLabelModel;
    use crate::span::Span;
    use recordlift_schema::presets::household;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn single_line_empty_record_is_dropped() {
        let doc = lines(&[""]);
        let spans = vec![LineSpans::new(0, vec![])];
        let schema = household();
        let weights = Weights::new();
        let caches = DecodeCaches::build(
            &doc,
            &spans,
            &weights,
            &schema,
            &default_boundary_features(),
            &default_segment_features(),
            &EnumerateOptions::default(),
            &ForcedConstraints::default(),
        )
        .unwrap();
        let seq = vec![JointState::new(Boundary::B, vec![])];
        let model = DefaultLabelModel;
        let records = assemble_records(&doc, &spans, &seq, &caches, &weights, &schema, &model);
        assert!(records.is_empty());
    }

    #[test]
    fn field_offsets_pass_through_unmodified() {
        let doc = lines(&["Henry Johnson\t45NUMBEU"]);
        let spans = vec![LineSpans::new(0, vec![Span::new(0, 13), Span::new(14, 22)])];
        let schema = household();
        let weights = Weights::new();
        let caches = DecodeCaches::build(
            &doc,
            &spans,
            &weights,
            &schema,
            &default_boundary_features(),
            &default_segment_features(),
            &EnumerateOptions::default(),
            &ForcedConstraints::default(),
        )
        .unwrap();
        let seq = vec![JointState::new(
            Boundary::B,
            vec!["Name".to_string(), "ExtID".to_string()],
        )];
        let model = DefaultLabelModel;
        let records = assemble_records(&doc, &spans, &seq, &caches, &weights, &schema, &model);
        assert_eq!(records.len(), 1);
        let entity = &records[0].entities[0];
        assert_eq!(entity.fields.len(), 2);
        assert_eq!(entity.fields[0].start, 0);
        assert_eq!(entity.fields[0].end, 13);
        assert_eq!(entity.fields[0].field_type, "Name");
        assert_eq!(entity.fields[1].start, 14);
        assert_eq!(entity.fields[1].end, 22);
        assert_eq!(entity.fields[1].field_type, "ExtID");
        for f in &entity.fields {
            assert!(f.confidence > 0.0 && f.confidence <= 1.0);
        }
    }
}
