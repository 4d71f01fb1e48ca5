//! Similarity ranking of stored passages against a query vector.
//!
//! Ranking is an exhaustive scan over the store, O(n·D). Candidates are
//! ordered by descending score; equal scores are ordered by descending
//! [`PassageKey`]. The tie-break carries no meaning, it only makes the
//! order reproducible.
//!
//! Under [`Similarity::Dot`] the score is the raw inner product, which
//! equals cosine similarity only for unit-length vectors; configure
//! [`Similarity::Cosine`] for providers that do not normalize.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::embedding::{cosine_similarity, dot};
use crate::error::{Error, Result};
use crate::models::RankedCandidate;
use crate::store::EmbeddingStore;

/// Scoring function used by [`rank`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Similarity {
    /// Inner product. Assumes unit-length vectors.
    #[default]
    Dot,
    /// Cosine similarity, independent of vector length.
    Cosine,
}

impl Similarity {
    pub fn score(self, query: &[f32], vector: &[f32]) -> f32 {
        match self {
            Similarity::Dot => dot(query, vector),
            Similarity::Cosine => cosine_similarity(query, vector),
        }
    }
}

/// Score every stored passage against `query`, best first.
pub fn rank(
    query: &[f32],
    store: &EmbeddingStore,
    similarity: Similarity,
) -> Result<Vec<RankedCandidate>> {
    let mut candidates = score_all(query, store, similarity)?;
    candidates.sort_by(rank_order);
    Ok(candidates)
}

/// The first `k` entries of [`rank`], without sorting the whole store.
pub fn top_k(
    query: &[f32],
    store: &EmbeddingStore,
    similarity: Similarity,
    k: usize,
) -> Result<Vec<RankedCandidate>> {
    let mut candidates = score_all(query, store, similarity)?;
    if k == 0 {
        return Ok(Vec::new());
    }
    if k < candidates.len() {
        candidates.select_nth_unstable_by(k - 1, rank_order);
        candidates.truncate(k);
    }
    candidates.sort_by(rank_order);
    Ok(candidates)
}

/// Descending score, then descending key.
fn rank_order(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.key.cmp(&a.key))
}

fn score_all(
    query: &[f32],
    store: &EmbeddingStore,
    similarity: Similarity,
) -> Result<Vec<RankedCandidate>> {
    let Some(dims) = store.dims() else {
        return Ok(Vec::new());
    };
    if store.is_empty() {
        return Ok(Vec::new());
    }
    if query.len() != dims {
        return Err(Error::QueryDimension {
            expected: dims,
            actual: query.len(),
        });
    }

    Ok(store
        .iter()
        .map(|(key, vector)| RankedCandidate {
            score: similarity.score(query, vector),
            key: key.clone(),
        })
        .collect())
}
