//! Per-query evaluation metrics and their aggregation.

pub mod aggregate;
pub mod bleu;
pub mod retrieval;
pub mod rouge;
pub mod semantic;

pub use aggregate::aggregate;
pub use semantic::{SemanticScore, SemanticScorer};

use crate::types::MetricMap;

pub const ROUGE1: &str = "rouge1";
pub const ROUGE2: &str = "rouge2";
pub const ROUGE_L: &str = "rougeL";
pub const BLEU: &str = "bleu";
pub const HIT_RATE: &str = "hit_rate";
pub const MRR: &str = "mrr";
pub const SEMANTIC_PRECISION: &str = "semantic_precision";
pub const SEMANTIC_RECALL: &str = "semantic_recall";
pub const SEMANTIC_F1: &str = "semantic_f1";

/// Metric name for recall at `k`, e.g. `recall@5`.
pub fn recall_key(k: usize) -> String {
    format!("recall@{k}")
}

/// Computes the per-query metric map.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsCalculator;

impl MetricsCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Text-overlap scores of `prediction` against `reference` plus the rank
    /// scores of `retrieved_ids` against `relevant_ids`.
    ///
    /// An empty prediction is scored like any other; it simply earns zeros.
    pub fn score(
        &self,
        prediction: &str,
        reference: &str,
        retrieved_ids: &[String],
        relevant_ids: &[String],
        k: usize,
    ) -> MetricMap {
        let mut metrics = self.score_text(prediction, reference);
        metrics.extend(self.score_retrieval(retrieved_ids, relevant_ids, k));
        metrics
    }

    /// ROUGE-1/2/L F-measures and sentence BLEU.
    pub fn score_text(&self, prediction: &str, reference: &str) -> MetricMap {
        let pred = rouge::tokenize(prediction);
        let reference_tokens = rouge::tokenize(reference);
        let mut metrics = MetricMap::new();
        metrics.insert(
            ROUGE1.into(),
            rouge::rouge_n(&pred, &reference_tokens, 1).fmeasure,
        );
        metrics.insert(
            ROUGE2.into(),
            rouge::rouge_n(&pred, &reference_tokens, 2).fmeasure,
        );
        metrics.insert(
            ROUGE_L.into(),
            rouge::rouge_l(&pred, &reference_tokens).fmeasure,
        );
        metrics.insert(BLEU.into(), bleu::sentence_bleu(prediction, reference));
        metrics
    }

    /// `recall@k`, `hit_rate` and `mrr`.
    pub fn score_retrieval(
        &self,
        retrieved_ids: &[String],
        relevant_ids: &[String],
        k: usize,
    ) -> MetricMap {
        let mut metrics = MetricMap::new();
        metrics.insert(
            recall_key(k),
            retrieval::recall_at_k(retrieved_ids, relevant_ids, k),
        );
        metrics.insert(
            HIT_RATE.into(),
            retrieval::hit_at_k(retrieved_ids, relevant_ids, k),
        );
        metrics.insert(
            MRR.into(),
            retrieval::reciprocal_rank(retrieved_ids, relevant_ids, k),
        );
        metrics
    }
}

/// Add semantic scores to a metric map.
pub fn insert_semantic(metrics: &mut MetricMap, score: SemanticScore) {
    metrics.insert(SEMANTIC_PRECISION.into(), score.precision);
    metrics.insert(SEMANTIC_RECALL.into(), score.recall);
    metrics.insert(SEMANTIC_F1.into(), score.f1);
}
