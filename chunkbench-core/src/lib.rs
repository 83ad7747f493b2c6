//! # Chunkbench Core
//!
//! Benchmarks document chunking strategies for retrieval-augmented
//! generation. Provides the chunkers, embedding and generation services,
//! nearest-neighbor retrieval, text and rank metrics, configuration, and the
//! experiment orchestrator that ties them together.

pub mod chunk;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod experiment;
pub mod extract;
pub mod generation;
pub mod metrics;
pub mod queries;
pub mod retriever;
pub mod sentence;
pub mod store;
pub mod tokenizer;
pub mod types;

// Re-export commonly used types at the crate root.
pub use chunk::{Chunker, ChunkingStrategy, chunk_text};
pub use config::{BenchConfig, load_config};
pub use embeddings::{EmbeddingService, LocalEmbedder, create_embedder};
pub use error::{ChunkbenchError, Result};
pub use experiment::{Collaborators, Evaluator, EvaluationSettings, ExperimentPhase, ExperimentRunner};
pub use generation::{GenerationService, MockGenerator, OpenAiCompatibleGenerator};
pub use metrics::MetricsCalculator;
pub use queries::QueryGenerator;
pub use store::{DirectoryDocumentStore, DocumentStore, InMemoryDocumentStore};
pub use types::{
    Document, EvaluationMode, ExperimentResult, ExperimentStatus, MetricSummary, Query,
    QueryMetrics, StrategyConfig,
};
