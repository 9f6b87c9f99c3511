//! Dynamic feature materialisation (§4.7 step 2, §9 resolution).
//!
//! The file-level feature-discovery pipeline that produces these
//! candidates is out of scope for this crate (§1); it hands the decoder
//! plain `{featureId, lineIndex, spanIndex?, value}` tuples plus a
//! `count`/`salience` pair used only for ranking. This module turns the
//! top-ranked candidates into [`crate::features::Feature`] values the cache
//! can evaluate like any built-in feature.

use std::collections::HashMap;

use crate::features::{Feature, FeatureContext};
use crate::span::LineSpans;

/// One match site for a dynamically-discovered feature.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicCandidate {
    /// The feature's suffix id; materialised as `"dyn:" + feature_id`.
    pub feature_id: String,
    /// The line this candidate was observed on.
    pub line_index: usize,
    /// `Some(span_index)` for a span-level (segment) feature; `None` for a
    /// line-level (boundary) feature.
    pub span_index: Option<usize>,
    /// The value to report at this match site.
    pub value: f64,
    /// Observed occurrence count, used for ranking (`count * salience`).
    pub count: f64,
    /// A salience score in `[0, 1]` supplied by the discovery pipeline.
    pub salience: f64,
}

/// A materialised `dyn:`-prefixed feature: closes over a lookup table of
/// its match sites rather than recomputing anything from the document.
pub struct DynamicFeature {
    id: String,
    is_span: bool,
    lookup: HashMap<(usize, Option<(usize, usize)>), f64>,
}

impl Feature for DynamicFeature {
    fn id(&self) -> &str {
        &self.id
    }

    fn apply(&self, ctx: &FeatureContext<'_>) -> f64 {
        let key = match &ctx.span {
            Some(sc) if self.is_span => (ctx.line_index, Some((sc.span.start, sc.span.end))),
            None if !self.is_span => (ctx.line_index, None),
            _ => return 0.0,
        };
        self.lookup.get(&key).copied().unwrap_or(0.0)
    }
}

/// Sort `candidates` by `count * salience` descending, take the top
/// `limit`, resolve each `span_index` against `spans_per_line` (a
/// candidate whose span no longer exists is dropped), and group the
/// survivors into one [`DynamicFeature`] per distinct `feature_id`.
///
/// Returns `(boundary_features, segment_features)`.
pub fn materialize_dynamic_features(
    candidates: &[DynamicCandidate],
    spans_per_line: &[LineSpans],
    limit: usize,
) -> (Vec<Box<dyn Feature>>, Vec<Box<dyn Feature>>) {
    let mut ranked: Vec<&DynamicCandidate> = candidates.iter().collect();
    ranked.sort_by(|a, b| {
        (b.count * b.salience)
            .partial_cmp(&(a.count * a.salience))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(limit);

    let mut line_lookups: HashMap<String, HashMap<(usize, Option<(usize, usize)>), f64>> =
        HashMap::new();
    let mut span_lookups: HashMap<String, HashMap<(usize, Option<(usize, usize)>), f64>> =
        HashMap::new();

    for c in ranked {
        match c.span_index {
            None => {
                line_lookups
                    .entry(c.feature_id.clone())
                    .or_default()
                    .insert((c.line_index, None), c.value);
            }
            Some(idx) => {
                let Some(line_spans) = spans_per_line.get(c.line_index) else {
                    continue;
                };
                let Some(span) = line_spans.spans.get(idx) else {
                    continue;
                };
                span_lookups
                    .entry(c.feature_id.clone())
                    .or_default()
                    .insert((c.line_index, Some((span.start, span.end))), c.value);
            }
        }
    }

    let boundary_features: Vec<Box<dyn Feature>> = line_lookups
        .into_iter()
        .map(|(feature_id, lookup)| {
            Box::new(DynamicFeature {
                id: format!("dyn:{feature_id}"),
                is_span: false,
                lookup,
            }) as Box<dyn Feature>
        })
        .collect();
    let segment_features: Vec<Box<dyn Feature>> = span_lookups
        .into_iter()
        .map(|(feature_id, lookup)| {
            Box::new(DynamicFeature {
                id: format!("dyn:{feature_id}"),
                is_span: true,
                lookup,
            }) as Box<dyn Feature>
        })
        .collect();

    (boundary_features, segment_features)
}
