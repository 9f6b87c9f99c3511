//! Entity-type annotator (§4.10): classifies each `B`-boundary line as
//! `Primary`, `Guardian`, or `Unknown` using a fixed linear scoring scheme
//! over boundary features — deliberately independent of the tunable
//! `Weights` map used elsewhere, since these coefficients are part of the
//! scheme itself (§Glossary), not a per-decode parameter.

use crate::boundary::{Boundary, EntityType};
use crate::features::{
    Feature, FeatureContext, HasBirthdate, HasLabel, HasName, HasPreferred, IndentationDelta,
    LeadingExtId, LeadingStructural, NextHasContact, PrimaryLikely, RoleKeyword, ShortTokenCount,
};
use crate::state::JointState;

const PRIMARY_WEIGHTS: &[(&str, f64)] = &[
    ("line.primary_likely", 2.0),
    ("line.leading_extid", 1.6),
    ("line.has_name", 1.6),
    ("line.has_preferred", 1.2),
    ("line.has_birthdate", 1.0),
    ("line.has_label", 1.0),
    ("line.next_has_contact", 1.2),
    ("line.short_token_count", 0.6),
    ("line.leading_structural", 0.2),
    ("line.indentation_delta", 0.2),
];

const GUARDIAN_WEIGHTS: &[(&str, f64)] = &[
    ("line.guardian_likely", 2.0),
    ("line.role_keyword", 2.0),
    ("line.leading_structural", 0.6),
    ("line.has_label", 0.4),
    ("line.short_token_count", 0.2),
];

fn feature_value(id: &str, ctx: &FeatureContext<'_>) -> f64 {
    match id {
        "line.primary_likely" => PrimaryLikely.apply(ctx),
        "line.guardian_likely" => crate::features::GuardianLikely.apply(ctx),
        "line.leading_extid" => LeadingExtId.apply(ctx),
        "line.has_name" => HasName.apply(ctx),
        "line.has_preferred" => HasPreferred.apply(ctx),
        "line.has_birthdate" => HasBirthdate.apply(ctx),
        "line.has_label" => HasLabel.apply(ctx),
        "line.next_has_contact" => NextHasContact.apply(ctx),
        "line.short_token_count" => ShortTokenCount.apply(ctx),
        "line.leading_structural" => LeadingStructural.apply(ctx),
        "line.indentation_delta" => IndentationDelta.apply(ctx),
        "line.role_keyword" => RoleKeyword.apply(ctx),
        _ => 0.0,
    }
}

fn classify_line(lines: &[String], line_idx: usize) -> EntityType {
    let ctx = FeatureContext::line(lines, line_idx);
    let mut p_score: f64 = PRIMARY_WEIGHTS
        .iter()
        .map(|(id, w)| w * feature_value(id, &ctx))
        .sum();
    let g_score: f64 = GUARDIAN_WEIGHTS
        .iter()
        .map(|(id, w)| w * feature_value(id, &ctx))
        .sum();
    if feature_value("line.has_name", &ctx) > 0.0 {
        p_score += 0.5;
    }
    if p_score >= 1.0 && p_score > g_score {
        EntityType::Primary
    } else if g_score >= 0.8 && g_score >= p_score {
        EntityType::Guardian
    } else {
        EntityType::Unknown
    }
}

/// Classify every `B`-boundary line in `joint_seq` and run the
/// orphan-guardian demotion post-pass.
///
/// This overwrites any pre-existing `entity_type` on `B` lines; callers
/// only invoke it when the decoded sequence has none set (§4.9 step 2).
pub fn annotate_entity_types(lines: &[String], joint_seq: &mut [JointState]) {
    for (i, state) in joint_seq.iter_mut().enumerate() {
        if matches!(state.boundary, Boundary::B) {
            state.entity_type = Some(classify_line(lines, i));
        }
    }
    demote_orphan_guardians(joint_seq);
}

/// A `Guardian` must have a preceding `Primary` within 3 boundary lines,
/// scanning backwards through the ordered list of `B`-boundary lines (not
/// raw document lines): an intervening `Unknown` boundary line blocks the
/// search from reaching any `Primary` beyond it. Failing that, look at the
/// single next boundary line; if it isn't `Primary` either, demote to
/// `Unknown`.
fn demote_orphan_guardians(joint_seq: &mut [JointState]) {
    let b_lines: Vec<usize> = joint_seq
        .iter()
        .enumerate()
        .filter(|(_, s)| matches!(s.boundary, Boundary::B))
        .map(|(i, _)| i)
        .collect();

    let mut demotions = Vec::new();
    for (pos, &line) in b_lines.iter().enumerate() {
        if joint_seq[line].entity_type != Some(EntityType::Guardian) {
            continue;
        }
        let mut found_primary = false;
        for back in 1..=3 {
            let Some(pos_back) = pos.checked_sub(back) else {
                break;
            };
            let candidate_line = b_lines[pos_back];
            match joint_seq[candidate_line].entity_type {
                Some(EntityType::Primary) => {
                    found_primary = true;
                    break;
                }
                Some(EntityType::Unknown) => break,
                _ => continue,
            }
        }
        if !found_primary {
            if let Some(&next_line) = b_lines.get(pos + 1) {
                if joint_seq[next_line].entity_type == Some(EntityType::Primary) {
                    found_primary = true;
                }
            }
        }
        if !found_primary {
            demotions.push(line);
        }
    }

    for line in demotions {
        joint_seq[line].entity_type = Some(EntityType::Unknown);
    }
}
