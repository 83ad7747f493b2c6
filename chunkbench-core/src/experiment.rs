//! Evaluation orchestrator.
//!
//! One experiment evaluates one [`StrategyConfig`] and moves through
//! `Chunking -> Embedding -> PerQueryEvaluation -> Aggregating -> Done`.
//! Failures local to a document or a query degrade that unit only. An
//! embedding failure aborts the strategy; [`ExperimentRunner`] records it and
//! moves on to the next configuration.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::chunk::{Chunker, ChunkingStrategy, any_chunk_exceeds, char_len};
use crate::config::{BenchConfig, ExperimentConfig};
use crate::embeddings::EmbeddingService;
use crate::error::{ChunkbenchError, ConfigError, EmbeddingError, ExtractionError, GenerationError};
use crate::extract::{PlainTextExtractor, TextExtractor};
use crate::generation::GenerationService;
use crate::metrics::{self, MetricsCalculator, SemanticScorer, aggregate, recall_key};
use crate::queries::QueryGenerator;
use crate::retriever::{FlatIndex, NearestNeighbors};
use crate::sentence::{RuleSentenceSplitter, SentenceSplitter};
use crate::store::DocumentStore;
use crate::tokenizer::TokenCodec;
use crate::types::{
    AggregatedMetrics, EvaluationMode, ExperimentResult, ExperimentStatus, MetricSummary, Query,
    QueryMetrics, StrategyConfig,
};

/// Lifecycle of one strategy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperimentPhase {
    Chunking,
    Embedding,
    PerQueryEvaluation,
    Aggregating,
    Done,
    Failed,
}

impl fmt::Display for ExperimentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExperimentPhase::Chunking => "chunking",
            ExperimentPhase::Embedding => "embedding",
            ExperimentPhase::PerQueryEvaluation => "per_query_evaluation",
            ExperimentPhase::Aggregating => "aggregating",
            ExperimentPhase::Done => "done",
            ExperimentPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// The collaborators an evaluation consumes. Optional capabilities are
/// explicit: no generator means retrieval-only, no tokenizer means the token
/// strategy approximates with characters.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn DocumentStore>,
    pub extractor: Arc<dyn TextExtractor>,
    pub embedder: Arc<dyn EmbeddingService>,
    pub generator: Option<Arc<dyn GenerationService>>,
    pub tokenizer: Option<Arc<dyn TokenCodec>>,
    pub splitter: Arc<dyn SentenceSplitter>,
    pub semantic: Option<Arc<SemanticScorer>>,
}

impl Collaborators {
    /// Plain-text extraction, rule-based sentence splitting, and no optional
    /// capabilities.
    pub fn new(store: Arc<dyn DocumentStore>, embedder: Arc<dyn EmbeddingService>) -> Self {
        Self {
            store,
            extractor: Arc::new(PlainTextExtractor),
            embedder,
            generator: None,
            tokenizer: None,
            splitter: Arc::new(RuleSentenceSplitter::new()),
            semantic: None,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_generator(mut self, generator: Option<Arc<dyn GenerationService>>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_tokenizer(mut self, tokenizer: Option<Arc<dyn TokenCodec>>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn with_splitter(mut self, splitter: Arc<dyn SentenceSplitter>) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn with_semantic(mut self, semantic: Option<Arc<SemanticScorer>>) -> Self {
        self.semantic = semantic;
        self
    }
}

/// Evaluation knobs taken from [`ExperimentConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationSettings {
    pub top_k: usize,
    pub min_chunk_chars: usize,
    pub max_concurrent_queries: usize,
    pub generation_timeout: Duration,
}

impl From<&ExperimentConfig> for EvaluationSettings {
    fn from(config: &ExperimentConfig) -> Self {
        Self {
            top_k: config.top_k,
            min_chunk_chars: config.min_chunk_chars,
            max_concurrent_queries: config.max_concurrent_queries,
            generation_timeout: Duration::from_secs(config.generation_timeout_secs),
        }
    }
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self::from(&ExperimentConfig::default())
    }
}

/// Chunks of every document for one strategy with their source ids and
/// vector index. Read-only during per-query evaluation.
#[derive(Debug, Clone, Default)]
pub struct PreparedCorpus {
    pub chunks: Vec<String>,
    pub document_ids: Vec<String>,
    pub index: FlatIndex,
}

impl PreparedCorpus {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Test queries with their vectors, embedded once and shared by every
/// strategy.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedQueries {
    pub queries: Vec<Query>,
    pub vectors: Vec<Vec<f32>>,
}

impl EmbeddedQueries {
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

/// Ranked chunks for one query.
struct Retrieved {
    chunks: Vec<String>,
    document_ids: Vec<String>,
}

fn retrieve_for(
    corpus: &PreparedCorpus,
    query_vector: &[f32],
    k: usize,
) -> Result<Retrieved, ChunkbenchError> {
    let ranked = corpus.index.search(query_vector, k)?;
    Ok(Retrieved {
        chunks: ranked.iter().map(|c| corpus.chunks[c.index].clone()).collect(),
        document_ids: ranked
            .iter()
            .map(|c| corpus.document_ids[c.index].clone())
            .collect(),
    })
}

/// Runs experiments for single strategy configurations.
pub struct Evaluator {
    collaborators: Collaborators,
    settings: EvaluationSettings,
    calculator: MetricsCalculator,
}

impl Evaluator {
    pub fn new(collaborators: Collaborators, settings: EvaluationSettings) -> Self {
        Self {
            collaborators,
            settings,
            calculator: MetricsCalculator::new(),
        }
    }

    pub fn settings(&self) -> &EvaluationSettings {
        &self.settings
    }

    pub fn has_generator(&self) -> bool {
        self.collaborators.generator.is_some()
    }

    fn enter(&self, config: &StrategyConfig, phase: ExperimentPhase) {
        info!(strategy = %config.name, phase = %phase, "Experiment phase");
    }

    pub fn chunker_for(&self, config: &StrategyConfig) -> Chunker {
        Chunker::new(config.strategy, config.chunk_size, config.chunk_overlap)
            .with_tokenizer(self.collaborators.tokenizer.clone())
            .with_splitter(self.collaborators.splitter.clone())
    }

    /// Chunk every document, dropping chunks shorter than `min_chunk_chars`.
    /// Documents without a payload or without extractable text contribute
    /// nothing. Returns `(chunks, document_ids)` as parallel vectors.
    pub fn chunk_corpus(&self, config: &StrategyConfig) -> (Vec<String>, Vec<String>) {
        let chunker = self.chunker_for(config);
        let mut chunks = Vec::new();
        let mut document_ids = Vec::new();

        for document in self.collaborators.store.documents() {
            let Some(raw) = self.collaborators.store.get_raw_bytes(&document.id) else {
                let err = ExtractionError::MissingPayload {
                    document_id: document.id.clone(),
                };
                warn!(strategy = %config.name, error = %err, "Skipping document");
                continue;
            };
            let text = self.collaborators.extractor.extract(&raw);
            if text.trim().is_empty() {
                let err = ExtractionError::EmptyText {
                    document_id: document.id.clone(),
                };
                warn!(strategy = %config.name, error = %err, "Skipping document");
                continue;
            }

            let doc_chunks = chunker.chunk(&text);
            if config.strategy == ChunkingStrategy::Recursive
                && any_chunk_exceeds(&doc_chunks, config.chunk_size)
            {
                debug!(
                    strategy = %config.name,
                    document_id = %document.id,
                    "Recursive chunking kept pieces larger than chunk_size"
                );
            }

            for chunk in doc_chunks {
                if char_len(&chunk) < self.settings.min_chunk_chars {
                    continue;
                }
                chunks.push(chunk);
                document_ids.push(document.id.clone());
            }
        }

        (chunks, document_ids)
    }

    /// Chunk and embed the corpus. `Ok(None)` means no chunk survived.
    pub async fn prepare_corpus(
        &self,
        config: &StrategyConfig,
    ) -> Result<Option<PreparedCorpus>, EmbeddingError> {
        self.enter(config, ExperimentPhase::Chunking);
        let (chunks, document_ids) = self.chunk_corpus(config);
        info!(strategy = %config.name, chunks = chunks.len(), "Generated chunks");
        if chunks.is_empty() {
            return Ok(None);
        }

        self.enter(config, ExperimentPhase::Embedding);
        let vectors = self.collaborators.embedder.embed(&chunks).await?;
        if vectors.len() != chunks.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: chunks.len(),
                got: vectors.len(),
            });
        }

        Ok(Some(PreparedCorpus {
            chunks,
            document_ids,
            index: FlatIndex::new(vectors),
        }))
    }

    /// Embed all query texts in one batched call.
    pub async fn embed_queries(&self, queries: &[Query]) -> Result<EmbeddedQueries, EmbeddingError> {
        let texts: Vec<String> = queries.iter().map(|q| q.query.clone()).collect();
        let vectors = self.collaborators.embedder.embed(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                got: vectors.len(),
            });
        }
        debug!(queries = vectors.len(), "Embedded test queries");
        Ok(EmbeddedQueries {
            queries: queries.to_vec(),
            vectors,
        })
    }

    /// Rank-only evaluation: `recall@k`, `hit_rate` and `mrr` per query.
    pub async fn run_retrieval_experiment(
        &self,
        config: &StrategyConfig,
        queries: &EmbeddedQueries,
    ) -> Result<ExperimentResult, ChunkbenchError> {
        let start = Instant::now();
        let mode = EvaluationMode::RetrievalOnly;
        let Some(corpus) = self.prepare_corpus(config).await? else {
            return Ok(self.empty_corpus(config, mode, queries.len(), start));
        };

        self.enter(config, ExperimentPhase::PerQueryEvaluation);
        let k = self.settings.top_k;
        let mut per_query = Vec::with_capacity(queries.len());
        for (query, vector) in queries.queries.iter().zip(&queries.vectors) {
            let retrieved = retrieve_for(&corpus, vector, k)?;
            let relevant = [query.document_id.clone()];
            per_query.push(QueryMetrics {
                document_id: query.document_id.clone(),
                metrics: self
                    .calculator
                    .score_retrieval(&retrieved.document_ids, &relevant, k),
            });
        }

        Ok(self.finish(config, mode, corpus.len(), queries.len(), per_query, start))
    }

    /// Full RAG evaluation: retrieve, generate, then score text and ranks.
    ///
    /// Queries run on a bounded pool of tasks. A failed or timed-out
    /// generation is scored as an empty prediction. Results keep query order.
    pub async fn run_rag_experiment(
        &self,
        config: &StrategyConfig,
        queries: &EmbeddedQueries,
    ) -> Result<ExperimentResult, ChunkbenchError> {
        let Some(generator) = self.collaborators.generator.clone() else {
            return Err(ConfigError::Invalid {
                message: "RAG mode needs a generation service".into(),
            }
            .into());
        };

        let start = Instant::now();
        let mode = EvaluationMode::Rag;
        let Some(corpus) = self.prepare_corpus(config).await? else {
            return Ok(self.empty_corpus(config, mode, queries.len(), start));
        };
        let corpus = Arc::new(corpus);

        self.enter(config, ExperimentPhase::PerQueryEvaluation);
        let k = self.settings.top_k;
        let timeout = self.settings.generation_timeout;
        let semaphore = Arc::new(tokio::sync::Semaphore::new(
            self.settings.max_concurrent_queries.max(1),
        ));
        // Retrieval errors abort before any generation task is spawned.
        let retrieved = queries
            .vectors
            .iter()
            .map(|vector| retrieve_for(&corpus, vector, k))
            .collect::<Result<Vec<_>, _>>()?;
        let mut handles = Vec::with_capacity(queries.len());

        for (query, retrieved) in queries.queries.iter().zip(retrieved) {
            let generator = generator.clone();
            let sem = semaphore.clone();
            let text = query.query.clone();
            let strategy = config.name.clone();

            let handle = tokio::spawn(async move {
                let _permit = sem.acquire().await.ok();
                let answer = match tokio::time::timeout(timeout, generator.answer(&text, &retrieved.chunks)).await {
                    Ok(Ok(answer)) => answer,
                    Ok(Err(e)) => {
                        warn!(strategy = %strategy, error = %e, "Generation failed, scoring empty prediction");
                        String::new()
                    }
                    Err(_) => {
                        let e = GenerationError::Timeout {
                            timeout_secs: timeout.as_secs(),
                        };
                        warn!(strategy = %strategy, error = %e, "Generation failed, scoring empty prediction");
                        String::new()
                    }
                };
                (answer, retrieved.document_ids)
            });
            handles.push(handle);
        }

        let outcomes = futures::future::join_all(handles).await;
        let mut predictions = Vec::with_capacity(outcomes.len());
        let mut per_query = Vec::with_capacity(outcomes.len());
        for (query, outcome) in queries.queries.iter().zip(outcomes) {
            let (prediction, retrieved_ids) = match outcome {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(strategy = %config.name, error = %e, "Query task failed");
                    (String::new(), Vec::new())
                }
            };
            let relevant = [query.document_id.clone()];
            per_query.push(QueryMetrics {
                document_id: query.document_id.clone(),
                metrics: self.calculator.score(
                    &prediction,
                    &query.reference,
                    &retrieved_ids,
                    &relevant,
                    k,
                ),
            });
            predictions.push((prediction, query.reference.clone()));
        }

        if let Some(scorer) = &self.collaborators.semantic {
            match scorer.score_batch(&predictions).await {
                Ok(scores) => {
                    for (record, score) in per_query.iter_mut().zip(scores) {
                        metrics::insert_semantic(&mut record.metrics, score);
                    }
                }
                Err(e) => warn!(strategy = %config.name, error = %e, "Semantic scoring skipped"),
            }
        }

        Ok(self.finish(config, mode, corpus.len(), queries.len(), per_query, start))
    }

    fn finish(
        &self,
        config: &StrategyConfig,
        mode: EvaluationMode,
        num_chunks: usize,
        num_queries: usize,
        per_query: Vec<QueryMetrics>,
        start: Instant,
    ) -> ExperimentResult {
        self.enter(config, ExperimentPhase::Aggregating);
        let mut result = ExperimentResult::empty(config, mode, ExperimentStatus::Completed);
        result.metrics = aggregate(per_query.iter().map(|q| &q.metrics));
        result.per_query_metrics = per_query;
        result.num_chunks = num_chunks;
        result.num_queries = num_queries;
        result.duration_ms = start.elapsed().as_millis() as u64;
        self.enter(config, ExperimentPhase::Done);
        result
    }

    fn empty_corpus(
        &self,
        config: &StrategyConfig,
        mode: EvaluationMode,
        num_queries: usize,
        start: Instant,
    ) -> ExperimentResult {
        warn!(strategy = %config.name, "No retrievable chunks, reporting zero metrics");
        let mut result = ExperimentResult::empty(config, mode, ExperimentStatus::EmptyCorpus);
        result.metrics = zero_metrics(
            mode,
            self.settings.top_k,
            self.collaborators.semantic.is_some(),
        );
        result.num_queries = num_queries;
        result.duration_ms = start.elapsed().as_millis() as u64;
        self.enter(config, ExperimentPhase::Done);
        result
    }
}

/// All-zero summaries for the metrics `mode` reports. Semantic keys are
/// included in RAG mode when a semantic scorer is configured.
fn zero_metrics(mode: EvaluationMode, k: usize, semantic: bool) -> AggregatedMetrics {
    let zero = MetricSummary {
        mean: 0.0,
        median: 0.0,
        std: 0.0,
        min: 0.0,
        max: 0.0,
    };
    let mut names = vec![recall_key(k), metrics::HIT_RATE.to_string(), metrics::MRR.to_string()];
    if mode == EvaluationMode::Rag {
        names.extend(
            [metrics::ROUGE1, metrics::ROUGE2, metrics::ROUGE_L, metrics::BLEU]
                .iter()
                .map(|s| s.to_string()),
        );
        if semantic {
            names.extend(
                [
                    metrics::SEMANTIC_PRECISION,
                    metrics::SEMANTIC_RECALL,
                    metrics::SEMANTIC_F1,
                ]
                .iter()
                .map(|s| s.to_string()),
            );
        }
    }
    names.into_iter().map(|n| (n, zero)).collect()
}

/// Runs every configured strategy over one corpus.
pub struct ExperimentRunner {
    evaluator: Evaluator,
    strategies: Vec<StrategyConfig>,
    num_queries: usize,
    seed: u64,
}

impl ExperimentRunner {
    pub fn new(
        evaluator: Evaluator,
        strategies: Vec<StrategyConfig>,
        num_queries: usize,
        seed: u64,
    ) -> Self {
        Self {
            evaluator,
            strategies,
            num_queries,
            seed,
        }
    }

    pub fn from_config(collaborators: Collaborators, config: &BenchConfig) -> Self {
        Self::new(
            Evaluator::new(collaborators, EvaluationSettings::from(&config.experiment)),
            config.strategies.clone(),
            config.experiment.num_queries,
            config.experiment.seed,
        )
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Generate the test queries from the store's catalog.
    pub fn build_queries(&self) -> Vec<Query> {
        let documents = self.evaluator.collaborators.store.documents();
        QueryGenerator::new(self.seed).generate(&documents, self.num_queries)
    }

    /// Evaluate every strategy, one result per configuration in order.
    ///
    /// Fails only if the test queries cannot be embedded; strategy failures
    /// are recorded in their results.
    pub async fn run_all(&self) -> Result<Vec<ExperimentResult>, ChunkbenchError> {
        let queries = self.build_queries();
        info!(
            queries = queries.len(),
            strategies = self.strategies.len(),
            rag = self.evaluator.has_generator(),
            "Starting experiment run"
        );
        let embedded = self.evaluator.embed_queries(&queries).await?;

        let mut results = Vec::with_capacity(self.strategies.len());
        for (i, config) in self.strategies.iter().enumerate() {
            info!(
                strategy = %config.name,
                index = i + 1,
                total = self.strategies.len(),
                "Testing strategy"
            );
            results.push(self.run_strategy(config, &embedded).await);
        }
        Ok(results)
    }

    /// RAG mode when a generator is present, falling back to retrieval-only;
    /// a strategy whose every mode fails gets a `Failed` result.
    pub async fn run_strategy(
        &self,
        config: &StrategyConfig,
        queries: &EmbeddedQueries,
    ) -> ExperimentResult {
        let started = Instant::now();
        if self.evaluator.has_generator() {
            match self.evaluator.run_rag_experiment(config, queries).await {
                Ok(result) => return result,
                Err(e) => warn!(
                    strategy = %config.name,
                    error = %e,
                    "RAG experiment failed, falling back to retrieval-only"
                ),
            }
        }

        match self.evaluator.run_retrieval_experiment(config, queries).await {
            Ok(result) => result,
            Err(e) => {
                warn!(strategy = %config.name, phase = %ExperimentPhase::Failed, error = %e, "Strategy failed");
                let mut result = ExperimentResult::empty(
                    config,
                    EvaluationMode::RetrievalOnly,
                    ExperimentStatus::Failed {
                        error: e.to_string(),
                    },
                );
                result.num_queries = queries.len();
                result.duration_ms = started.elapsed().as_millis() as u64;
                result
            }
        }
    }
}
