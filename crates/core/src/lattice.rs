//! Windowed Viterbi lattice decoder with beam carry-over (§4.6).
//!
//! A window's lattice is a contiguous 2-D array indexed by `(column,
//! state-index)`; back-pointers are plain integer indices, never a
//! graph/pointer structure.

use recordlift_schema::FieldSchema;

use crate::boundary::Boundary;
use crate::cache::DecodeCaches;
use crate::label_model::LabelModel;
use crate::span::is_whitespace_only;
use crate::state::JointState;
use crate::weights::Weights;

/// One hypothesis carried across a window boundary: the decoded state at
/// the end of the previous window, plus its accumulated score.
#[derive(Debug, Clone)]
pub struct BeamEntry {
    /// The last-column decoded state this hypothesis ended on.
    pub state: JointState,
    /// Its accumulated lattice score.
    pub score: f64,
}

/// The result of decoding one window: the path through it plus the
/// outgoing beam (top-K last-column cells) for the next window.
#[derive(Debug, Clone)]
pub struct WindowDecodeResult {
    /// The decoded `JointState` path, one per line in `[start, end_exclusive)`.
    pub path: Vec<JointState>,
    /// Top-K last-column cells by score, for carry-over into the next window.
    pub outgoing_beam: Vec<BeamEntry>,
}

/// Transition score between adjacent boundary labels (§4.4).
///
/// `any_to_B` applies whenever the successor is `B` (both `B→B` and
/// `C→B`); `B_to_B`/`C_to_C` apply only on top of that when the pair
/// matches exactly. `B→C` earns no term at all — this asymmetry (a
/// continuation is "free" to end, but starting one is rewarded and
/// sustaining one is penalised net of the any-to-B bonus) is intentional
/// and must be preserved.
pub fn transition_score(prev: Boundary, next: Boundary, weights: &Weights) -> f64 {
    let mut score = 0.0;
    if matches!(next, Boundary::B) {
        score += weights.get_or("transition.any_to_B", 0.4);
    }
    if matches!(prev, Boundary::B) && matches!(next, Boundary::B) {
        score += weights.get_or("transition.B_to_B", -0.5);
    }
    if matches!(prev, Boundary::C) && matches!(next, Boundary::C) {
        score += weights.get_or("transition.C_to_C", 0.3);
    }
    score
}

/// Emission score for a candidate state on line `line_idx` (§4.4).
pub fn emission_score(
    caches: &DecodeCaches,
    line_idx: usize,
    state: &JointState,
    weights: &Weights,
    schema: &FieldSchema,
    label_model: &dyn LabelModel,
) -> f64 {
    let boundary_base = caches.boundary_base(line_idx);
    let boundary_contribution = match state.boundary {
        Boundary::B => boundary_base,
        Boundary::C => -boundary_base,
    };
    let span_features = caches.span_features(line_idx);
    let span_text = caches.span_text(line_idx);
    let field_contribution: f64 = state
        .fields
        .iter()
        .enumerate()
        .map(|(k, label)| {
            label_model.score_span_label(label, &span_text[k], &span_features[k], weights, schema)
        })
        .sum();
    boundary_contribution + field_contribution
}

/// `+0.75` when the line at `line_idx` has any non-whitespace content,
/// applied only to `B` candidates and only when there is no incoming beam
/// (§4.4, §9 "empty list" resolution). An incoming beam that is present
/// but empty (`Some(vec![])`) is treated identically to `None`.
fn first_line_bias(lines: &[String], line_idx: usize, boundary: Boundary) -> f64 {
    if !matches!(boundary, Boundary::B) {
        return 0.0;
    }
    match lines.get(line_idx) {
        Some(text) if !is_whitespace_only(text) => 0.75,
        _ => 0.0,
    }
}

/// Decode the window `[start, end_exclusive)` given an optional incoming
/// beam, returning the decoded path and the window's outgoing beam.
///
/// `lines` is the full document (used only for the first-line bias check
/// and line lookups); `caches` must have been built over the same lines.
#[allow(clippy::too_many_arguments)]
pub fn decode_window(
    lines: &[String],
    caches: &DecodeCaches,
    schema: &FieldSchema,
    weights: &Weights,
    label_model: &dyn LabelModel,
    start: usize,
    end_exclusive: usize,
    incoming_beam: &[BeamEntry],
    beam_size: usize,
) -> WindowDecodeResult {
    let window_len = end_exclusive.saturating_sub(start);
    if window_len == 0 {
        return WindowDecodeResult {
            path: Vec::new(),
            outgoing_beam: Vec::new(),
        };
    }

    let state_spaces: Vec<&[JointState]> = (start..end_exclusive)
        .map(|t| caches.state_spaces(t))
        .collect();
    let emissions: Vec<Vec<f64>> = (start..end_exclusive)
        .map(|t| {
            state_spaces[t - start]
                .iter()
                .map(|s| emission_score(caches, t, s, weights, schema, label_model))
                .collect()
        })
        .collect();

    // cells[col][i] = best score reaching state i at column col.
    // backpointers[col][i] = Some(j) indexing into cells[col-1], or None
    // for column 0 (whose predecessor, if any, lives in the incoming beam).
    let mut cells: Vec<Vec<f64>> = Vec::with_capacity(window_len);
    let mut backpointers: Vec<Vec<Option<usize>>> = Vec::with_capacity(window_len);

    // Column 0.
    {
        let states0 = state_spaces[0];
        let mut col = Vec::with_capacity(states0.len());
        if !incoming_beam.is_empty() {
            for (i, s) in states0.iter().enumerate() {
                let best = incoming_beam
                    .iter()
                    .map(|b| b.score + transition_score(b.state.boundary, s.boundary, weights))
                    .fold(f64::NEG_INFINITY, f64::max);
                col.push(best + emissions[0][i]);
            }
        } else {
            for (i, s) in states0.iter().enumerate() {
                col.push(emissions[0][i] + first_line_bias(lines, start, s.boundary));
            }
        }
        cells.push(col);
        backpointers.push(vec![None; states0.len()]);
    }

    // Subsequent columns.
    for t in 1..window_len {
        let states_prev = state_spaces[t - 1];
        let states_cur = state_spaces[t];
        let prev_cells = &cells[t - 1];
        let mut col = Vec::with_capacity(states_cur.len());
        let mut bp = Vec::with_capacity(states_cur.len());
        for (i, s) in states_cur.iter().enumerate() {
            let mut best_score = f64::NEG_INFINITY;
            let mut best_j = 0usize;
            for (j, ps) in states_prev.iter().enumerate() {
                let score = prev_cells[j] + transition_score(ps.boundary, s.boundary, weights);
                if score > best_score {
                    best_score = score;
                    best_j = j;
                }
            }
            col.push(best_score + emissions[t][i]);
            bp.push(Some(best_j));
        }
        cells.push(col);
        backpointers.push(bp);
    }

    // Back-trace from the arg-max of the last column (lowest index on ties).
    let last = window_len - 1;
    let mut best_i = 0usize;
    let mut best_score = f64::NEG_INFINITY;
    for (i, &score) in cells[last].iter().enumerate() {
        if score > best_score {
            best_score = score;
            best_i = i;
        }
    }

    let mut path_indices = vec![0usize; window_len];
    path_indices[last] = best_i;
    for t in (1..window_len).rev() {
        let prev_i = backpointers[t][path_indices[t]].unwrap_or(0);
        path_indices[t - 1] = prev_i;
    }

    let path: Vec<JointState> = path_indices
        .iter()
        .enumerate()
        .map(|(t, &i)| state_spaces[t][i].clone())
        .collect();

    // Outgoing beam: top-K last-column cells by score.
    let k = beam_size.max(1);
    let mut ranked: Vec<(usize, f64)> = cells[last].iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let outgoing_beam: Vec<BeamEntry> = ranked
        .into_iter()
        .take(k)
        .map(|(i, score)| BeamEntry {
            state: state_spaces[last][i].clone(),
            score,
        })
        .collect();

    WindowDecodeResult {
        path,
        outgoing_beam,
    }
}
