//! Full-scan cosine similarity retrieval.

use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;

/// One ranked candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    /// Position in the candidate list passed to [`retrieve`].
    pub index: usize,
    pub score: f32,
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Rank `candidates` by cosine similarity to `query` and return the best `k`.
///
/// Scores descend; equal scores keep candidate order. Fewer than `k`
/// candidates returns all of them.
pub fn retrieve(
    query: &[f32],
    candidates: &[Vec<f32>],
    k: usize,
) -> Result<Vec<ScoredCandidate>, RetrievalError> {
    if k == 0 {
        return Err(RetrievalError::InvalidK);
    }
    if let Some((index, candidate)) = candidates
        .iter()
        .enumerate()
        .find(|(_, c)| c.len() != query.len())
    {
        return Err(RetrievalError::DimensionMismatch {
            query: query.len(),
            candidate: candidate.len(),
            index,
        });
    }

    let mut scored: Vec<ScoredCandidate> = candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            let score = cosine_similarity(query, candidate);
            ScoredCandidate {
                index,
                score: if score.is_nan() { f32::NEG_INFINITY } else { score },
            }
        })
        .collect();

    // Stable, so ties keep candidate order.
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(k);
    Ok(scored)
}

/// Nearest-neighbor search over a fixed set of vectors.
///
/// Approximate indexes can implement this with the same contract as
/// [`retrieve`].
pub trait NearestNeighbors: Send + Sync {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredCandidate>, RetrievalError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exhaustive index over owned vectors.
#[derive(Debug, Clone, Default)]
pub struct FlatIndex {
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    pub fn new(vectors: Vec<Vec<f32>>) -> Self {
        Self { vectors }
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }
}

impl NearestNeighbors for FlatIndex {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredCandidate>, RetrievalError> {
        retrieve(query, &self.vectors, k)
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_edge_cases() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_identical_vector_ranks_first() {
        let query = vec![0.6, 0.8, 0.0];
        let candidates = vec![vec![1.0, 0.0, 0.0], query.clone(), vec![0.0, 0.0, 1.0]];
        let top = retrieve(&query, &candidates, 1).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].index, 1);
        assert!((top[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_ties_keep_candidate_order() {
        let query = vec![1.0, 0.0];
        let candidates = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0]];
        let ranked = retrieve(&query, &candidates, 4).unwrap();
        let order: Vec<usize> = ranked.iter().map(|c| c.index).collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
    }

    #[test]
    fn test_k_larger_than_candidates() {
        let ranked = retrieve(&[1.0], &[vec![1.0], vec![-1.0]], 10).unwrap();
        assert_eq!(ranked.len(), 2);
        assert!(retrieve(&[1.0], &[], 3).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_k_and_dimension_mismatch() {
        assert!(matches!(
            retrieve(&[1.0], &[vec![1.0]], 0),
            Err(RetrievalError::InvalidK)
        ));
        assert!(matches!(
            retrieve(&[1.0, 0.0], &[vec![1.0, 0.0], vec![1.0]], 1),
            Err(RetrievalError::DimensionMismatch { index: 1, .. })
        ));
    }

    #[test]
    fn test_flat_index_matches_retrieve() {
        let vectors = vec![vec![1.0, 0.0], vec![0.7, 0.7], vec![0.0, 1.0]];
        let index = FlatIndex::new(vectors.clone());
        assert_eq!(index.len(), 3);
        assert!(!index.is_empty());
        let query = [0.0, 1.0];
        assert_eq!(
            index.search(&query, 2).unwrap(),
            retrieve(&query, &vectors, 2).unwrap()
        );
    }
}
