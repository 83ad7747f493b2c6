//! Embedding-based semantic overlap between prediction and reference.
//!
//! Each token is embedded once; a prediction token's precision contribution
//! is its best cosine match among reference tokens, and vice versa for
//! recall. All tokens across every pair are embedded in a single call.

use std::collections::HashMap;
use std::sync::Arc;

use super::rouge::tokenize;
use crate::embeddings::EmbeddingService;
use crate::error::EmbeddingError;
use crate::retriever::cosine_similarity;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SemanticScore {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

pub struct SemanticScorer {
    embedder: Arc<dyn EmbeddingService>,
}

impl SemanticScorer {
    pub fn new(embedder: Arc<dyn EmbeddingService>) -> Self {
        Self { embedder }
    }

    /// Score `(prediction, reference)` pairs in one embedding batch.
    pub async fn score_batch(
        &self,
        pairs: &[(String, String)],
    ) -> Result<Vec<SemanticScore>, EmbeddingError> {
        let tokenized: Vec<(Vec<String>, Vec<String>)> = pairs
            .iter()
            .map(|(pred, reference)| (tokenize(pred), tokenize(reference)))
            .collect();

        let mut vocab: Vec<String> = tokenized
            .iter()
            .flat_map(|(p, r)| p.iter().chain(r.iter()).cloned())
            .collect();
        vocab.sort();
        vocab.dedup();

        if vocab.is_empty() {
            return Ok(vec![SemanticScore::default(); pairs.len()]);
        }

        let vectors = self.embedder.embed(&vocab).await?;
        if vectors.len() != vocab.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: vocab.len(),
                got: vectors.len(),
            });
        }
        let lookup: HashMap<&str, &[f32]> = vocab
            .iter()
            .map(String::as_str)
            .zip(vectors.iter().map(Vec::as_slice))
            .collect();

        Ok(tokenized
            .iter()
            .map(|(pred, reference)| score_pair(pred, reference, &lookup))
            .collect())
    }
}

fn greedy_match(from: &[String], to: &[String], lookup: &HashMap<&str, &[f32]>) -> f64 {
    if from.is_empty() || to.is_empty() {
        return 0.0;
    }
    let total: f64 = from
        .iter()
        .map(|a| {
            let va = lookup.get(a.as_str()).copied().unwrap_or_default();
            to.iter()
                .map(|b| {
                    let vb = lookup.get(b.as_str()).copied().unwrap_or_default();
                    cosine_similarity(va, vb) as f64
                })
                .fold(f64::NEG_INFINITY, f64::max)
        })
        .sum();
    total / from.len() as f64
}

fn score_pair(
    prediction: &[String],
    reference: &[String],
    lookup: &HashMap<&str, &[f32]>,
) -> SemanticScore {
    let precision = greedy_match(prediction, reference, lookup);
    let recall = greedy_match(reference, prediction, lookup);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    SemanticScore {
        precision,
        recall,
        f1,
    }
}
