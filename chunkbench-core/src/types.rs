//! Domain types shared by the chunker, the evaluator and the reporting layer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::chunk::ChunkingStrategy;

/// Metric name → scalar value for one query.
pub type MetricMap = BTreeMap<String, f64>;

/// Metric name → summary statistics for one strategy configuration.
pub type AggregatedMetrics = BTreeMap<String, MetricSummary>;

/// A source document. Immutable once ingested; the raw payload lives in a
/// [`DocumentStore`](crate::store::DocumentStore) and is fetched by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub published: Option<chrono::NaiveDate>,
}

impl Document {
    pub fn new(id: &str, title: &str, abstract_text: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            abstract_text: abstract_text.to_string(),
            authors: Vec::new(),
            categories: Vec::new(),
            published: None,
        }
    }
}

/// How a test query was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// The abstract is both the query and the expected answer; the system
    /// should reconstruct it from the document's chunks.
    AbstractReconstruction,
    Custom,
}

/// A query text with its expected answer and ground-truth source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub query: String,
    pub reference: String,
    pub document_id: String,
    #[serde(default)]
    pub title: String,
    pub kind: QueryKind,
}

/// Per-query metric record, keyed by the query's relevant document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMetrics {
    pub document_id: String,
    pub metrics: MetricMap,
}

/// Summary statistics over one metric's per-query values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Which evaluation loop produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// Retrieval + generation + text metrics.
    Rag,
    /// Rank metrics only (hit rate, MRR, recall@k).
    RetrievalOnly,
}

/// Terminal state of one strategy's evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExperimentStatus {
    Completed,
    /// The strategy produced no retrievable chunks; metrics are empty.
    EmptyCorpus,
    /// Every evaluation mode failed for this strategy.
    Failed { error: String },
}

/// A named strategy configuration, the unit an experiment run iterates over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub name: String,
    pub strategy: ChunkingStrategy,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl StrategyConfig {
    pub fn new(
        name: &str,
        strategy: ChunkingStrategy,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Self {
        Self {
            name: name.to_string(),
            strategy,
            chunk_size,
            chunk_overlap,
        }
    }
}

/// Durable output of evaluating one strategy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentResult {
    pub name: String,
    pub strategy: ChunkingStrategy,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub mode: EvaluationMode,
    #[serde(flatten)]
    pub status: ExperimentStatus,
    pub num_chunks: usize,
    pub num_queries: usize,
    pub metrics: AggregatedMetrics,
    pub per_query_metrics: Vec<QueryMetrics>,
    pub duration_ms: u64,
}

impl ExperimentResult {
    /// An empty result for `config`; the evaluator fills it in.
    pub fn empty(config: &StrategyConfig, mode: EvaluationMode, status: ExperimentStatus) -> Self {
        Self {
            name: config.name.clone(),
            strategy: config.strategy,
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            mode,
            status,
            num_chunks: 0,
            num_queries: 0,
            metrics: AggregatedMetrics::new(),
            per_query_metrics: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Mean of `metric`, if any query reported it.
    pub fn mean(&self, metric: &str) -> Option<f64> {
        self.metrics.get(metric).map(|s| s.mean)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, ExperimentStatus::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_serde_uses_abstract_key() {
        let json = r#"{"id":"2501.00001","title":"T","abstract":"A study."}"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.abstract_text, "A study.");
        assert!(doc.authors.is_empty());
        assert!(doc.published.is_none());

        let back = serde_json::to_value(&doc).unwrap();
        assert_eq!(back["abstract"], "A study.");
    }

    #[test]
    fn test_experiment_result_status_is_flattened() {
        let config = StrategyConfig::new("Fixed-500", ChunkingStrategy::Fixed, 500, 50);
        let result = ExperimentResult::empty(
            &config,
            EvaluationMode::RetrievalOnly,
            ExperimentStatus::Failed {
                error: "embedding service down".into(),
            },
        );
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error"], "embedding service down");
        assert_eq!(value["strategy"], "fixed");
        assert!(result.is_failed());
    }

    #[test]
    fn test_experiment_result_mean_lookup() {
        let config = StrategyConfig::new("Recursive-500", ChunkingStrategy::Recursive, 500, 50);
        let mut result =
            ExperimentResult::empty(&config, EvaluationMode::Rag, ExperimentStatus::Completed);
        result.metrics.insert(
            "rouge1".into(),
            MetricSummary {
                mean: 0.4,
                median: 0.4,
                std: 0.0,
                min: 0.4,
                max: 0.4,
            },
        );
        assert_eq!(result.mean("rouge1"), Some(0.4));
        assert_eq!(result.mean("bleu"), None);
    }
}
