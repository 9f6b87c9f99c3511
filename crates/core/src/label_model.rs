//! Label model: shapes a raw feature value into a per-label contribution.

use std::collections::HashMap;

use recordlift_schema::FieldSchema;

use crate::weights::Weights;

/// Asymmetric feature-to-label shaping plus the weighted span-label score.
///
/// The default implementation is replaceable: any type implementing this
/// trait can stand in for [`DefaultLabelModel`] in [`crate::cache::DecodeCaches`]
/// construction and the lattice decoder.
pub trait LabelModel {
    /// Shape `feature_value` (of feature `feature_id`, on a span whose text
    /// is `span_text`) into a contribution for `label`.
    fn feature_contribution(
        &self,
        label: &str,
        span_text: &str,
        feature_id: &str,
        feature_value: f64,
        schema: &FieldSchema,
    ) -> f64;

    /// `Σ weights[fid] · feature_contribution(...)` over `span_features`,
    /// restricted to the ids `label`'s [`recordlift_schema::FieldConfig::applicable_features`]
    /// allows (all of them, if unset). Always `0.0` for the noise label.
    fn score_span_label(
        &self,
        label: &str,
        span_text: &str,
        span_features: &HashMap<String, f64>,
        weights: &Weights,
        schema: &FieldSchema,
    ) -> f64 {
        if label == schema.noise_label() {
            return 0.0;
        }
        let field = schema.field(label);
        span_features
            .iter()
            .filter(|(fid, _)| field.is_none_or(|f| f.uses_feature(fid)))
            .map(|(fid, value)| {
                weights.get(fid) * self.feature_contribution(label, span_text, fid, *value, schema)
            })
            .sum()
    }
}

/// The default, module-level label model: `segment.is_X` favours label `X`
/// (`+1.0`) and penalises every other non-noise label (`-0.5`), with a
/// special flip for `segment.is_extid` on 10/11-digit spans (they read as
/// phone numbers, not external ids).
pub struct DefaultLabelModel;

/// Maps a `segment.is_X` suffix to the schema label it favours by default.
fn is_x_target_label(suffix: &str) -> Option<&'static str> {
    match suffix {
        "email" => Some("Email"),
        "phone" => Some("Phone"),
        "birthdate" => Some("Birthdate"),
        "name" => Some("Name"),
        "preferred_name" => Some("PreferredName"),
        "extid" => Some("ExtID"),
        _ => None,
    }
}

impl LabelModel for DefaultLabelModel {
    fn feature_contribution(
        &self,
        label: &str,
        span_text: &str,
        feature_id: &str,
        feature_value: f64,
        schema: &FieldSchema,
    ) -> f64 {
        if label == schema.noise_label() {
            return 0.0;
        }
        let Some(suffix) = feature_id.strip_prefix("segment.is_") else {
            return feature_value;
        };
        let Some(target) = is_x_target_label(suffix) else {
            return feature_value;
        };

        if suffix == "extid" {
            let digits = digit_only_len(span_text);
            // 10/11-digit spans read as phone numbers, not external ids: swap
            // which label the `+1.0`/`-0.5` shaping favours.
            let favoured = if digits == 10 || digits == 11 {
                "Phone"
            } else {
                target
            };
            return if label == favoured {
                feature_value
            } else {
                -0.5 * feature_value
            };
        }

        if label == target {
            feature_value
        } else {
            -0.5 * feature_value
        }
    }
}

fn digit_only_len(text: &str) -> usize {
    text.chars().filter(char::is_ascii_digit).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use recordlift_schema::presets::household;

    #[test]
    fn is_x_favours_its_own_label() {
        let schema = household();
        let model = DefaultLabelModel;
        let contribution =
            model.feature_contribution("Email", "a@b.com", "segment.is_email", 1.0, &schema);
        assert_eq!(contribution, 1.0);
    }

    #[test]
    fn is_x_penalises_other_labels() {
        let schema = household();
        let model = DefaultLabelModel;
        let contribution =
            model.feature_contribution("Name", "a@b.com", "segment.is_email", 1.0, &schema);
        assert_eq!(contribution, -0.5);
    }

    #[test]
    fn is_extid_flips_for_ten_digit_spans() {
        let schema = household();
        let model = DefaultLabelModel;
        let extid_contribution = model.feature_contribution(
            "ExtID",
            "5551234567",
            "segment.is_extid",
            1.0,
            &schema,
        );
        let phone_contribution = model.feature_contribution(
            "Phone",
            "5551234567",
            "segment.is_extid",
            1.0,
            &schema,
        );
        assert!(extid_contribution < 0.0);
        assert!(phone_contribution > 0.0);
    }

    #[test]
    fn is_extid_does_not_flip_for_non_numeric_ids() {
        let schema = household();
        let model = DefaultLabelModel;
        let contribution =
            model.feature_contribution("ExtID", "45NUMBEU", "segment.is_extid", 1.0, &schema);
        assert_eq!(contribution, 1.0);
    }

    #[test]
    fn noise_label_never_scores() {
        let schema = household();
        let model = DefaultLabelModel;
        let mut feats = HashMap::new();
        feats.insert("segment.is_email".to_string(), 1.0);
        let weights = Weights::from_pairs([("segment.is_email", 1.0)]);
        let score =
            model.score_span_label(schema.noise_label(), "a@b.com", &feats, &weights, &schema);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn score_span_label_sums_weighted_contributions() {
        let schema = household();
        let model = DefaultLabelModel;
        let mut feats = HashMap::new();
        feats.insert("segment.is_email".to_string(), 1.0);
        feats.insert("segment.is_phone".to_string(), 0.0);
        let weights = Weights::from_pairs([("segment.is_email", 2.0), ("segment.is_phone", 3.0)]);
        let score = model.score_span_label("Email", "a@b.com", &feats, &weights, &schema);
        assert_eq!(score, 2.0);
    }
}
