//! Exact top-k retrieval by cosine similarity.
//!
//! Rows and queries are unit length, so the score of row `i` is the dot
//! product `vectors[i] · query`. Selection partitions around the k-th best
//! score in O(N) and sorts only the k survivors.
//!
//! Ranking order is total: higher score first, equal scores by ascending row
//! index, NaN after every other score. Repeated calls with the same inputs
//! return identical output.

use ndarray::ArrayView1;
use std::cmp::Ordering;
use tracing::debug;
use tvrec_common::{Result, TvRecError};

use crate::store::VectorStore;
use crate::types::RankedResult;

/// Return the `k` rows most similar to `query`, best first.
///
/// `k` larger than the store is clamped; an empty store yields no results.
pub fn search(store: &VectorStore, query: &[f32], k: usize) -> Result<Vec<RankedResult>> {
    if k == 0 {
        return Err(TvRecError::InvalidK(0));
    }
    if store.is_empty() {
        return Ok(Vec::new());
    }

    let dim = store.vectors().ncols();
    if query.len() != dim {
        return Err(TvRecError::DimensionMismatch {
            expected: dim,
            found: query.len(),
        });
    }

    let scores = store.vectors().dot(&ArrayView1::from(query)).to_vec();
    let top = top_k_indices(&scores, k);

    debug!(
        "Top-{} search over {} rows - best score: {:?}",
        top.len(),
        scores.len(),
        top.first().map(|&i| scores[i])
    );

    let records = store.records();
    Ok(top
        .into_iter()
        .enumerate()
        .map(|(pos, row)| RankedResult {
            rank: pos + 1,
            id: records[row].id,
            title: records[row].title.clone(),
            score: scores[row],
        })
        .collect())
}

/// Indices of the `k` best scores in ranking order
pub fn top_k_indices(scores: &[f32], k: usize) -> Vec<usize> {
    let k = k.min(scores.len());
    if k == 0 {
        return Vec::new();
    }

    let mut indices: Vec<usize> = (0..scores.len()).collect();
    if k < indices.len() {
        indices.select_nth_unstable_by(k - 1, |&a, &b| rank_order(scores, a, b));
        indices.truncate(k);
    }
    indices.sort_unstable_by(|&a, &b| rank_order(scores, a, b));
    indices
}

/// NaN sinks to the bottom and both zeros compare equal
fn rank_key(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else if score == 0.0 {
        0.0
    } else {
        score
    }
}

fn rank_order(scores: &[f32], a: usize, b: usize) -> Ordering {
    rank_key(scores[b])
        .total_cmp(&rank_key(scores[a]))
        .then(a.cmp(&b))
}
