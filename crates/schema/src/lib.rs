//! Field schema data model for the recordlift decoder.
//!
//! A [`FieldSchema`] is the contract a caller hands the decoder: an ordered
//! list of [`FieldConfig`] entries plus the reserved noise label. Everything
//! here is plain, `serde`-round-trippable data — the schema carries no
//! decode logic of its own.

#![warn(missing_docs)]

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Presets for common field schemas.
pub mod presets;

/// A feature identifier, e.g. `"segment.is_email"` or `"line.blank"`.
///
/// Stored as a plain `String` rather than an interned type: schemas and
/// weights are small, constructed once per document, and serialized as
/// ordinary JSON object keys.
pub type FeatureId = String;

/// Errors that can occur when constructing a [`FieldSchema`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// Two fields share the same name.
    #[error("duplicate field name: {0}")]
    DuplicateField(String),

    /// A field's name collides with the schema's noise label.
    #[error("field name collides with noise label: {0}")]
    NoiseLabelCollision(String),
}

/// Configuration for a single field in a [`FieldSchema`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldConfig {
    /// The field's label, e.g. `"Name"` or `"Phone"`.
    pub name: String,
    /// Whether at least one span with this label must appear per record.
    /// Not enforced by the decoder itself (see `DESIGN.md`); carried for
    /// callers that want to post-validate assembled records.
    #[serde(default)]
    pub required: bool,
    /// Maximum number of spans with this label allowed per line-state.
    /// Defaults to `1` (non-repeatable).
    #[serde(default = "default_max_allowed")]
    pub max_allowed: u32,
    /// When present, restricts `scoreSpanLabel` for this label to sum only
    /// over these feature ids. When absent, every span feature id known to
    /// the cache contributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicable_features: Option<HashSet<FeatureId>>,
    /// Feature ids that act as hard gates: a span is only a legal
    /// enumerator choice for this label if every listed feature evaluates
    /// strictly positive for that span.
    #[serde(default)]
    pub validators: Vec<FeatureId>,
}

fn default_max_allowed() -> u32 {
    1
}

impl FieldConfig {
    /// Construct a field config with default cardinality (`max_allowed = 1`)
    /// and no validators or feature restriction.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            max_allowed: 1,
            applicable_features: None,
            validators: Vec::new(),
        }
    }

    /// Builder: set `max_allowed`.
    pub fn with_max_allowed(mut self, max_allowed: u32) -> Self {
        self.max_allowed = max_allowed;
        self
    }

    /// Builder: mark the field required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Builder: restrict scoring to the given feature ids.
    pub fn with_applicable_features(mut self, features: HashSet<FeatureId>) -> Self {
        self.applicable_features = Some(features);
        self
    }

    /// Builder: attach hard-gate validators.
    pub fn with_validators(mut self, validators: Vec<FeatureId>) -> Self {
        self.validators = validators;
        self
    }

    /// `true` if `feature_id` should contribute to this field's score.
    pub fn uses_feature(&self, feature_id: &str) -> bool {
        match &self.applicable_features {
            Some(set) => set.contains(feature_id),
            None => true,
        }
    }
}

/// An ordered set of field configurations plus the reserved noise label.
///
/// Deserializing a `FieldSchema` re-runs the same uniqueness validation as
/// [`FieldSchema::new`] (via an internal `TryFrom`), so a schema loaded from
/// JSON can never skip the invariant a hand-built one is required to uphold.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldSchema {
    /// Fields in declaration order. Enumeration and assembly both iterate
    /// this order when several candidates tie on score.
    fields: Vec<FieldConfig>,
    /// The label assigned to spans that carry no field, e.g. `"NOISE"`.
    noise_label: String,
}

#[derive(Deserialize)]
struct FieldSchemaRaw {
    fields: Vec<FieldConfig>,
    noise_label: String,
}

impl TryFrom<FieldSchemaRaw> for FieldSchema {
    type Error = SchemaError;

    fn try_from(raw: FieldSchemaRaw) -> Result<Self, SchemaError> {
        FieldSchema::new(raw.fields, raw.noise_label)
    }
}

impl<'de> Deserialize<'de> for FieldSchema {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = FieldSchemaRaw::deserialize(deserializer)?;
        FieldSchema::try_from(raw).map_err(serde::de::Error::custom)
    }
}

impl FieldSchema {
    /// Construct a schema from an ordered field list and noise label,
    /// validating uniqueness.
    pub fn new(
        fields: Vec<FieldConfig>,
        noise_label: impl Into<String>,
    ) -> Result<Self, SchemaError> {
        let noise_label = noise_label.into();
        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if field.name == noise_label {
                return Err(SchemaError::NoiseLabelCollision(field.name.clone()));
            }
            if !seen.insert(field.name.clone()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
        }
        Ok(Self {
            fields,
            noise_label,
        })
    }

    /// The schema's fields in declaration order.
    pub fn fields(&self) -> &[FieldConfig] {
        &self.fields
    }

    /// The reserved noise label.
    pub fn noise_label(&self) -> &str {
        &self.noise_label
    }

    /// Look up a field's configuration by name.
    pub fn field(&self, name: &str) -> Option<&FieldConfig> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// `true` if `label` is a real (non-noise) field in this schema.
    pub fn is_field(&self, label: &str) -> bool {
        label != self.noise_label && self.field(label).is_some()
    }

    /// The `max_allowed` cardinality cap for `label`, or `1` for unknown
    /// labels (the enumerator never emits labels outside the schema, so
    /// this only matters for the noise label, which has no cap).
    pub fn max_allowed(&self, label: &str) -> u32 {
        self.field(label).map_or(u32::MAX, |f| f.max_allowed)
    }

    /// All non-noise labels in this schema, declaration order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}
