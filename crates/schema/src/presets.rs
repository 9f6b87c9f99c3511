//! Concrete named schema instances used across the test suite and doc
//! examples, mirroring the reference toolchain's habit of shipping a
//! ready-made profile alongside the generic builder API.

use crate::{FieldConfig, FieldSchema};

/// The `household` schema: a contact-roster extraction schema pairing a
/// primary/guardian entity with an external id, one or two names, a
/// preferred name, up to three phone numbers and emails, free-text notes,
/// and a birthdate.
///
/// ```
/// let schema = recordlift_schema::presets::household();
/// assert_eq!(schema.max_allowed("Phone"), 3);
/// assert_eq!(schema.noise_label(), "NOISE");
/// ```
pub fn household() -> FieldSchema {
    FieldSchema::new(
        vec![
            FieldConfig::new("ExtID").with_validators(vec!["segment.is_extid".to_string()]),
            FieldConfig::new("Name")
                .with_max_allowed(2)
                .with_validators(vec!["segment.is_name".to_string()]),
            FieldConfig::new("PreferredName")
                .with_validators(vec!["segment.is_preferred_name".to_string()]),
            FieldConfig::new("Phone")
                .with_max_allowed(3)
                .with_validators(vec!["segment.is_phone".to_string()]),
            FieldConfig::new("Email")
                .with_max_allowed(3)
                .with_validators(vec!["segment.is_email".to_string()]),
            FieldConfig::new("GeneralNotes"),
            FieldConfig::new("MedicalNotes"),
            FieldConfig::new("DietaryNotes"),
            FieldConfig::new("Birthdate")
                .with_validators(vec!["segment.is_birthdate".to_string()]),
        ],
        "NOISE",
    )
    .expect("household preset has distinct field names and no noise-label collision")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn household_has_expected_cardinalities() {
        let schema = household();
        assert_eq!(schema.max_allowed("ExtID"), 1);
        assert_eq!(schema.max_allowed("Name"), 2);
        assert_eq!(schema.max_allowed("PreferredName"), 1);
        assert_eq!(schema.max_allowed("Phone"), 3);
        assert_eq!(schema.max_allowed("Email"), 3);
        assert_eq!(schema.max_allowed("GeneralNotes"), 1);
        assert_eq!(schema.max_allowed("MedicalNotes"), 1);
        assert_eq!(schema.max_allowed("DietaryNotes"), 1);
        assert_eq!(schema.max_allowed("Birthdate"), 1);
        assert_eq!(schema.noise_label(), "NOISE");
        assert_eq!(schema.fields().len(), 9);
    }
}
