//! State enumerator: generates the allowed joint states for one line.

use std::collections::HashMap;

use recordlift_schema::FieldSchema;

use crate::boundary::{Boundary, EntityType};
use crate::span::{Span, is_whitespace_only, span_text};
use crate::state::JointState;

/// Options controlling the state enumerator.
#[derive(Debug, Clone)]
pub struct EnumerateOptions {
    /// Maximum distinct non-noise labels per line. Default `3`.
    pub max_unique_fields: usize,
    /// Per-label multiplicity cap overrides (take precedence only by being
    /// combined via `min` with the schema's own cap).
    pub max_states_per_field: HashMap<String, u32>,
    /// Positions fully enumerated before noise-tailing. Default `8`.
    pub safe_prefix: usize,
    /// Hard cap on states per line. Default `2048`.
    pub max_states: usize,
}

impl Default for EnumerateOptions {
    fn default() -> Self {
        Self {
            max_unique_fields: 3,
            max_states_per_field: HashMap::new(),
            safe_prefix: 8,
            max_states: 2048,
        }
    }
}

/// The enumerated states for one line, plus whether the hard `max_states`
/// cap truncated the search (the soft `CapacityExhausted` condition).
#[derive(Debug, Clone)]
pub struct EnumerationResult {
    /// Candidate joint states for the line.
    pub states: Vec<JointState>,
    /// `true` if enumeration stopped early because `states.len()` reached
    /// `max_states`.
    pub truncated: bool,
}

/// Enumerate the joint states for a single line.
///
/// `span_features` must have one entry per span in `spans`, each the
/// feature-id → value map for that span (used to enforce
/// [`recordlift_schema::FieldConfig::validators`] hard gates).
#[allow(clippy::too_many_arguments)]
pub fn enumerate_line_states(
    spans: &[Span],
    line_text: &str,
    span_features: &[HashMap<String, f64>],
    schema: &FieldSchema,
    opts: &EnumerateOptions,
    forced_labels: Option<&HashMap<(usize, usize), String>>,
    forced_boundary: Option<Boundary>,
    forced_entity_type: Option<EntityType>,
) -> EnumerationResult {
    let ctx = EnumCtx {
        spans,
        line_text,
        span_features,
        schema,
        opts,
        forced_labels,
        forced_boundary,
        forced_entity_type,
    };
    let mut states = Vec::new();
    let mut truncated = false;
    let mut current = Vec::with_capacity(spans.len());
    let mut counts: HashMap<String, u32> = HashMap::new();
    let mut unique = 0usize;
    backtrack(
        &ctx,
        0,
        &mut current,
        &mut counts,
        &mut unique,
        &mut states,
        &mut truncated,
    );
    EnumerationResult { states, truncated }
}

struct EnumCtx<'a> {
    spans: &'a [Span],
    line_text: &'a str,
    span_features: &'a [HashMap<String, f64>],
    schema: &'a FieldSchema,
    opts: &'a EnumerateOptions,
    forced_labels: Option<&'a HashMap<(usize, usize), String>>,
    forced_boundary: Option<Boundary>,
    forced_entity_type: Option<EntityType>,
}

fn cap_ok(
    label: &str,
    counts: &HashMap<String, u32>,
    unique: usize,
    ctx: &EnumCtx<'_>,
) -> bool {
    let cur = counts.get(label).copied().unwrap_or(0);
    let schema_cap = ctx.schema.max_allowed(label);
    let override_cap = ctx
        .opts
        .max_states_per_field
        .get(label)
        .copied()
        .unwrap_or(u32::MAX);
    let cap = schema_cap.min(override_cap);
    if cur + 1 > cap {
        return false;
    }
    let would_be_new = cur == 0;
    if would_be_new && unique + 1 > ctx.opts.max_unique_fields {
        return false;
    }
    true
}

fn validators_ok(label: &str, feats: &HashMap<String, f64>, schema: &FieldSchema) -> bool {
    match schema.field(label) {
        Some(field) => field
            .validators
            .iter()
            .all(|fid| feats.get(fid).copied().unwrap_or(0.0) > 0.0),
        None => true,
    }
}

fn emit_boundary_variants(
    ctx: &EnumCtx<'_>,
    combo: Vec<String>,
    states: &mut Vec<JointState>,
    truncated: &mut bool,
) {
    let boundaries: &[Boundary] = match ctx.forced_boundary {
        Some(b) => match b {
            Boundary::B => &[Boundary::B],
            Boundary::C => &[Boundary::C],
        },
        None => &[Boundary::B, Boundary::C],
    };
    for &boundary in boundaries {
        if states.len() >= ctx.opts.max_states {
            *truncated = true;
            return;
        }
        let entity_type = if matches!(boundary, Boundary::B) {
            ctx.forced_entity_type
        } else {
            None
        };
        states.push(JointState {
            boundary,
            fields: combo.clone(),
            entity_type,
        });
    }
}

fn backtrack(
    ctx: &EnumCtx<'_>,
    idx: usize,
    current: &mut Vec<String>,
    counts: &mut HashMap<String, u32>,
    unique: &mut usize,
    states: &mut Vec<JointState>,
    truncated: &mut bool,
) {
    if states.len() >= ctx.opts.max_states {
        *truncated = true;
        return;
    }

    if idx == ctx.spans.len() || idx >= ctx.opts.safe_prefix {
        let mut combo = current.clone();
        for _ in idx..ctx.spans.len() {
            combo.push(ctx.schema.noise_label().to_string());
        }
        emit_boundary_variants(ctx, combo, states, truncated);
        return;
    }

    let span = ctx.spans[idx];
    let text = span_text(ctx.line_text, span);
    let noise = ctx.schema.noise_label().to_string();

    if is_whitespace_only(text) {
        current.push(noise);
        backtrack(ctx, idx + 1, current, counts, unique, states, truncated);
        current.pop();
        return;
    }

    if let Some(forced) = ctx
        .forced_labels
        .and_then(|m| m.get(&(span.start, span.end)))
    {
        let chosen = if forced == ctx.schema.noise_label()
            || (validators_ok(forced, &ctx.span_features[idx], ctx.schema)
                && cap_ok(forced, counts, *unique, ctx))
        {
            forced.clone()
        } else {
            noise
        };
        apply_and_recurse(ctx, idx, chosen, current, counts, unique, states, truncated);
        return;
    }

    let candidates: Vec<String> = ctx
        .schema
        .labels()
        .map(str::to_string)
        .chain(std::iter::once(ctx.schema.noise_label().to_string()))
        .collect();

    for label in candidates {
        if states.len() >= ctx.opts.max_states {
            *truncated = true;
            return;
        }
        if label != ctx.schema.noise_label() {
            if !validators_ok(&label, &ctx.span_features[idx], ctx.schema) {
                continue;
            }
            if !cap_ok(&label, counts, *unique, ctx) {
                continue;
            }
        }
        apply_and_recurse(
            ctx,
            idx,
            label,
            current,
            counts,
            unique,
            states,
            truncated,
        );
    }
}

#[allow(clippy::too_many_arguments)]
fn apply_and_recurse(
    ctx: &EnumCtx<'_>,
    idx: usize,
    label: String,
    current: &mut Vec<String>,
    counts: &mut HashMap<String, u32>,
    unique: &mut usize,
    states: &mut Vec<JointState>,
    truncated: &mut bool,
) {
    let is_new_unique = label != ctx.schema.noise_label() && !counts.contains_key(&label);
    *counts.entry(label.clone()).or_insert(0) += 1;
    if is_new_unique {
        *unique += 1;
    }
    current.push(label.clone());

    backtrack(ctx, idx + 1, current, counts, unique, states, truncated);

    current.pop();
    if let Some(c) = counts.get_mut(&label) {
        *c -= 1;
    }
    if is_new_unique {
        *unique -= 1;
    }
}
