//! Shared test helpers for `recordlift_core` integration tests.

#![allow(dead_code)]

use recordlift_core::{LineSpans, Span, Weights};

/// Turn string literals into owned `String` lines.
pub fn lines(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

/// A weight vector with real signal on the boundary/segment features this
/// module's fixtures touch, so the lattice actually has to choose a
/// boundary rather than settling on whatever the enumeration order happens
/// to try first.
pub fn household_weights() -> Weights {
    Weights::from_pairs([
        ("line.has_name", 3.0),
        ("line.leading_extid", 3.0),
        ("line.indentation_delta", -3.0),
        ("line.outline_bullet", -3.0),
        ("segment.is_name", 2.0),
        ("segment.is_extid", 2.0),
        ("segment.is_phone", 2.0),
        ("segment.is_email", 2.0),
        ("segment.is_birthdate", 2.0),
        ("segment.is_preferred_name", 2.0),
    ])
}

/// A two-record household-schema document, each record a primary line plus
/// two indented continuation lines.
pub fn two_record_document() -> (Vec<String>, Vec<LineSpans>) {
    let doc = lines(&[
        "Henry Johnson\t45NUMBEU",
        "\t* Eats most school meals.",
        "\t* 2014-05-04",
        "Oliver Smith\tDBYE6KPR",
        "\t* 2014-12-15",
    ]);
    let spans = vec![
        LineSpans::new(0, vec![Span::new(0, 13), Span::new(14, 22)]),
        LineSpans::new(1, vec![Span::new(3, 26)]),
        LineSpans::new(2, vec![Span::new(3, 13)]),
        LineSpans::new(3, vec![Span::new(0, 12), Span::new(13, 21)]),
        LineSpans::new(4, vec![Span::new(3, 13)]),
    ];
    (doc, spans)
}
