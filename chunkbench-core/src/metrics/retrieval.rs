//! Rank-based retrieval scores over document ids.

use std::collections::HashSet;

/// `|top-k(retrieved) ∩ relevant| / |relevant|`, or 0 when nothing is relevant.
pub fn recall_at_k(retrieved_ids: &[String], relevant_ids: &[String], k: usize) -> f64 {
    let relevant: HashSet<&str> = relevant_ids.iter().map(String::as_str).collect();
    if relevant.is_empty() {
        return 0.0;
    }
    let top_k: HashSet<&str> = retrieved_ids.iter().take(k).map(String::as_str).collect();
    top_k.intersection(&relevant).count() as f64 / relevant.len() as f64
}

/// `1 / rank` of the first relevant id within the top `k`, else 0.
pub fn reciprocal_rank(retrieved_ids: &[String], relevant_ids: &[String], k: usize) -> f64 {
    retrieved_ids
        .iter()
        .take(k)
        .position(|id| relevant_ids.contains(id))
        .map_or(0.0, |pos| 1.0 / (pos + 1) as f64)
}

/// 1 when any of the top `k` ids is relevant, else 0.
pub fn hit_at_k(retrieved_ids: &[String], relevant_ids: &[String], k: usize) -> f64 {
    if retrieved_ids.iter().take(k).any(|id| relevant_ids.contains(id)) {
        1.0
    } else {
        0.0
    }
}
