//! Feature-weight map: feature id → scalar weight.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading a [`Weights`] map from JSON.
#[derive(Debug, Error)]
pub enum WeightsError {
    /// JSON deserialization failed.
    #[error("invalid weights JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// A mapping from feature id (`"line.*"`, `"segment.*"`, `"token.*"`,
/// `"field.*"`, `"transition.*"`, `"dyn:*"`) to a scalar weight.
///
/// Iteration order never affects scores — every consumer sums over this map,
/// and summation is commutative — so the underlying `HashMap` is fine; no
/// ordering guarantee is promised or needed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Weights(HashMap<String, f64>);

impl Weights {
    /// An empty weight map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a weight map from an iterator of `(id, value)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// The weight for `id`, or `0.0` if absent.
    pub fn get(&self, id: &str) -> f64 {
        self.0.get(id).copied().unwrap_or(0.0)
    }

    /// The weight for `id`, or `default` if absent.
    pub fn get_or(&self, id: &str, default: f64) -> f64 {
        self.0.get(id).copied().unwrap_or(default)
    }

    /// Insert a weight for `id`, overwriting any existing value.
    pub fn set(&mut self, id: impl Into<String>, value: f64) {
        self.0.insert(id.into(), value);
    }

    /// Insert a weight for `id` only if one is not already present.
    pub fn seed_if_absent(&mut self, id: impl Into<String>, value: f64) {
        self.0.entry(id.into()).or_insert(value);
    }

    /// Parse a weight map from a JSON object of `{feature_id: weight}` pairs.
    ///
    /// ```
    /// use recordlift_core::Weights;
    ///
    /// let w = Weights::load_from_json(r#"{"segment.is_phone": 1.0}"#).unwrap();
    /// assert_eq!(w.get("segment.is_phone"), 1.0);
    /// ```
    pub fn load_from_json(s: &str) -> Result<Self, WeightsError> {
        let weights: Self = serde_json::from_str(s)?;
        Ok(weights)
    }

    /// Serialize this weight map to a JSON object of `{feature_id: weight}`
    /// pairs.
    ///
    /// # Panics
    /// Panics if the map somehow contains a non-finite value that
    /// `serde_json` refuses to encode; `Weights` never constructs one.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("weight values are always finite")
    }
}
