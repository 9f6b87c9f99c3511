//! End-to-end scenarios over the `household` schema: one record per line
//! family, a forced-label assertion, a removal assertion, and the empty
//! line edge case.

mod common;

use recordlift_core::{
    EnumerateOptions, Feedback, FeedbackEntry, Feature, FieldAction, LineSpans, Span, Weights,
    decode_full_via_streaming, decode_joint_sequence,
};
use recordlift_core::{DefaultLabelModel, StreamingOptions, default_boundary_features, default_segment_features};
use recordlift_schema::presets::household;

fn features() -> (Vec<Box<dyn Feature>>, Vec<Box<dyn Feature>>) {
    (default_boundary_features(), default_segment_features())
}

/// S1: two adjacent household records, each a name/id line plus two
/// indented continuation lines, must assemble into exactly two records.
#[test]
fn two_name_and_id_lines_become_two_records() {
    let (doc, spans) = common::two_record_document();
    let schema = household();
    let weights = common::household_weights();
    let model = DefaultLabelModel;
    let (boundary, segment) = features();

    let records = decode_full_via_streaming(
        &doc,
        &spans,
        &weights,
        &schema,
        boundary,
        segment,
        &EnumerateOptions::default(),
        &model,
        &StreamingOptions::default(),
    )
    .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].start_line, 0);
    assert_eq!(records[0].end_line, 2);
    assert_eq!(records[1].start_line, 3);
    assert_eq!(records[1].end_line, 4);

    for record in &records {
        assert_eq!(record.entities.len(), 1);
        assert_eq!(
            record.entities[0].entity_type,
            recordlift_core::EntityType::Primary
        );
    }

    let first_entity = &records[0].entities[0];
    let name_field = first_entity
        .fields
        .iter()
        .find(|f| f.line_index == 0 && f.start == 0)
        .expect("a field at line 0, span 0");
    assert_eq!(name_field.field_type, "Name");
    let extid_field = first_entity
        .fields
        .iter()
        .find(|f| f.line_index == 0 && f.start == 14)
        .expect("a field at line 0, span 14");
    assert_eq!(extid_field.field_type, "ExtID");
}

/// S2: a single line with three spans must pass offsets through unmodified
/// and keep them ordered, non-overlapping, and exactly matching the
/// underlying text.
#[test]
fn three_field_line_offsets_are_ordered_and_exact() {
    let text = "  * Joshua Anderson (Grandparent)";
    let doc = common::lines(&[text]);
    // "Joshua" at 4..10, "Anderson" at 11..19, "(Grandparent)" at 20..33.
    let spans = vec![LineSpans::new(
        0,
        vec![Span::new(4, 10), Span::new(11, 19), Span::new(20, 33)],
    )];
    let schema = household();
    let weights = Weights::new();
    let (boundary, segment) = features();
    let caches = recordlift_core::DecodeCaches::build(
        &doc,
        &spans,
        &weights,
        &schema,
        &boundary,
        &segment,
        &EnumerateOptions::default(),
        &recordlift_core::ForcedConstraints::default(),
    )
    .unwrap();
    let seq = vec![recordlift_core::JointState::new(
        recordlift_core::Boundary::B,
        vec!["Name".to_string(), "Name".to_string(), "GeneralNotes".to_string()],
    )];
    let model = DefaultLabelModel;
    let records =
        recordlift_core::assemble_records(&doc, &spans, &seq, &caches, &weights, &schema, &model);

    assert_eq!(records.len(), 1);
    let entity = &records[0].entities[0];
    assert_eq!(entity.fields.len(), 3);

    let mut prev_end = 0;
    for (field, expected_text) in entity
        .fields
        .iter()
        .zip(["Joshua", "Anderson", "(Grandparent)"])
    {
        assert!(field.start >= prev_end);
        assert!(field.end > field.start);
        assert_eq!(&text[field.start..field.end], expected_text);
        prev_end = field.end;
    }
}

/// S3: a forced `Name` label on the first span must survive decode exactly,
/// regardless of weights; the line itself decodes as a record start.
#[test]
fn forced_label_feedback_pins_the_span() {
    let doc = common::lines(&["Foo Bar"]);
    let spans = vec![LineSpans::new(0, vec![Span::new(0, 3), Span::new(4, 7)])];
    let schema = household();
    let weights = Weights::new();
    let model = DefaultLabelModel;
    let (boundary, segment) = features();

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
    let opts = StreamingOptions {
        feedback: Some(feedback),
        ..Default::default()
    };

    let records = decode_full_via_streaming(
        &doc,
        &spans,
        &weights,
        &schema,
        boundary,
        segment,
        &EnumerateOptions::default(),
        &model,
        &opts,
    )
    .unwrap();

    assert_eq!(records.len(), 1);
    let entity = &records[0].entities[0];
    assert_eq!(entity.start_line, 0);
    let name_field = entity
        .fields
        .iter()
        .find(|f| f.start == 0 && f.end == 3)
        .expect("the forced span survives decode");
    assert_eq!(name_field.field_type, "Name");
}

/// S5: a removal assertion over the whole span must suppress the `Phone`
/// label even though `segment.is_phone` would otherwise win outright.
#[test]
fn removal_feedback_suppresses_an_otherwise_winning_label() {
    let doc = common::lines(&["5551234567"]);
    let spans = vec![LineSpans::new(0, vec![Span::new(0, 10)])];
    let schema = household();
    let weights = Weights::from_pairs([("segment.is_phone", 5.0)]);
    let model = DefaultLabelModel;
    let (boundary, segment) = features();

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
    let opts = StreamingOptions {
        feedback: Some(feedback),
        ..Default::default()
    };

    let records = decode_full_via_streaming(
        &doc,
        &spans,
        &weights,
        &schema,
        boundary,
        segment,
        &EnumerateOptions::default(),
        &model,
        &opts,
    )
    .unwrap();

    let has_phone = records
        .iter()
        .flat_map(|r| &r.entities)
        .flat_map(|e| &e.fields)
        .any(|f| f.field_type == "Phone");
    assert!(!has_phone);
}

/// S6: a single empty line decodes to one all-noise state and yields no
/// record at all (the assembler drops entities with no non-noise labels).
#[test]
fn empty_line_yields_no_record() {
    let doc = common::lines(&[""]);
    let spans = vec![LineSpans::new(0, vec![])];
    let schema = household();
    let weights = Weights::new();
    let model = DefaultLabelModel;
    let (boundary, segment) = features();

    let seq = decode_joint_sequence(
        &doc,
        &spans,
        &weights,
        &schema,
        &boundary,
        &segment,
        &EnumerateOptions::default(),
        &model,
    )
    .unwrap();
    assert_eq!(seq.len(), 1);
    assert!(seq[0].fields.is_empty());

    let (boundary, segment) = features();
    let records = decode_full_via_streaming(
        &doc,
        &spans,
        &weights,
        &schema,
        boundary,
        segment,
        &EnumerateOptions::default(),
        &model,
        &StreamingOptions::default(),
    )
    .unwrap();
    assert!(records.is_empty());
}
