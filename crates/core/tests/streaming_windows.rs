//! S4: a cross-window sub-entity assertion must force its boundaries and
//! entity type regardless of where the streaming driver's window cuts fall.

mod common;

use recordlift_core::{
    EntityType, Feedback, FeedbackEntry, StreamingOptions, Weights, decode_full_via_streaming,
    default_boundary_features, default_segment_features,
};
use recordlift_core::{DefaultLabelModel, EnumerateOptions, LineSpans};
use recordlift_diagnostics::LineOffsets;
use recordlift_schema::presets::household;

#[test]
fn guardian_assertion_survives_a_three_line_lookahead() {
    let doc: Vec<String> = (0..20).map(|i| format!("line {i}")).collect();
    let spans: Vec<LineSpans> = (0..20).map(|i| LineSpans::new(i, vec![])).collect();
    let schema = household();
    let weights = Weights::new();
    let model = DefaultLabelModel;

    let line_offsets = LineOffsets::from_line_lengths(doc.iter().map(String::len));
    let file_start = line_offsets.line_start(5).unwrap();
    let file_end = line_offsets.line_end(8).unwrap();

    let feedback = Feedback {
        entries: vec![FeedbackEntry::Entity {
            file_start,
            file_end,
            entity_type: EntityType::Guardian,
        }],
    };
    let opts = StreamingOptions {
        lookahead_lines: 3,
        feedback: Some(feedback),
        ..Default::default()
    };

    let records = decode_full_via_streaming(
        &doc,
        &spans,
        &weights,
        &schema,
        default_boundary_features(),
        default_segment_features(),
        &EnumerateOptions::default(),
        &model,
        &opts,
    )
    .unwrap();

    let guardian_entity = records
        .iter()
        .flat_map(|r| &r.entities)
        .find(|e| e.entity_type == EntityType::Guardian)
        .expect("the asserted guardian entity survives assembly");

    assert_eq!(guardian_entity.start_line, 5);
    assert!(guardian_entity.end_line >= 8);

    // No other entity may claim any of lines 5..=8 — the run is contiguous
    // and exclusively Guardian-typed.
    for line in 5..=8 {
        let claimants: Vec<_> = records
            .iter()
            .flat_map(|r| &r.entities)
            .filter(|e| e.start_line <= line && line <= e.end_line)
            .collect();
        assert_eq!(claimants.len(), 1, "line {line} must belong to exactly one entity");
        assert_eq!(claimants[0].entity_type, EntityType::Guardian);
    }
}
