//! Configuration system for chunkbench.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> CLI args.
//! Configuration is loaded from the user config dir (`chunkbench/config.toml`) and/or
//! `.chunkbench/config.toml` in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::chunk::ChunkingStrategy;
use crate::error::ConfigError;
use crate::types::StrategyConfig;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchConfig {
    #[serde(default)]
    pub experiment: ExperimentConfig,
    #[serde(default = "default_strategies")]
    pub strategies: Vec<StrategyConfig>,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub tokenizer: TokenizerConfig,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            experiment: ExperimentConfig::default(),
            strategies: default_strategies(),
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
            metrics: MetricsConfig::default(),
            tokenizer: TokenizerConfig::default(),
        }
    }
}

impl BenchConfig {
    /// Reject values the evaluator cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.experiment.top_k == 0 {
            return Err(invalid("experiment.top_k must be at least 1"));
        }
        if self.experiment.max_concurrent_queries == 0 {
            return Err(invalid("experiment.max_concurrent_queries must be at least 1"));
        }
        if self.embedding.batch_size == 0 {
            return Err(invalid("embedding.batch_size must be at least 1"));
        }
        if self.embedding.dimensions == 0 {
            return Err(invalid("embedding.dimensions must be at least 1"));
        }
        for strategy in &self.strategies {
            if strategy.strategy.requires_chunk_size() && strategy.chunk_size == 0 {
                return Err(invalid(&format!(
                    "strategy '{}' needs a chunk_size above 0",
                    strategy.name
                )));
            }
        }
        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid {
        message: message.to_string(),
    }
}

/// Experiment-wide knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Chunks retrieved per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Chunks shorter than this (in characters) are dropped before embedding.
    #[serde(default = "default_min_chunk_chars")]
    pub min_chunk_chars: usize,
    #[serde(default = "default_num_queries")]
    pub num_queries: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_max_concurrent_queries")]
    pub max_concurrent_queries: usize,
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,
}

fn default_top_k() -> usize {
    5
}

fn default_min_chunk_chars() -> usize {
    50
}

fn default_num_queries() -> usize {
    20
}

fn default_seed() -> u64 {
    42
}

fn default_max_concurrent_queries() -> usize {
    4
}

fn default_generation_timeout_secs() -> u64 {
    60
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_chunk_chars: default_min_chunk_chars(),
            num_queries: default_num_queries(),
            seed: default_seed(),
            max_concurrent_queries: default_max_concurrent_queries(),
            generation_timeout_secs: default_generation_timeout_secs(),
        }
    }
}

/// The five reference configurations.
pub fn default_strategies() -> Vec<StrategyConfig> {
    vec![
        StrategyConfig::new("Fixed-500", ChunkingStrategy::Fixed, 500, 50),
        StrategyConfig::new("Recursive-500", ChunkingStrategy::Recursive, 500, 50),
        StrategyConfig::new("Token-256", ChunkingStrategy::Token, 256, 32),
        StrategyConfig::new("Sentence-500", ChunkingStrategy::Sentence, 500, 100),
        StrategyConfig::new("Paragraph-Overlap", ChunkingStrategy::Paragraph, 0, 100),
    ]
}

/// Embedding provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// `local`, `openai` or `ollama`.
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,
    /// Overrides the provider's default endpoint.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Environment variable holding the API key (OpenAI only).
    #[serde(default = "default_embedding_api_key_env")]
    pub api_key_env: String,
}

fn default_embedding_provider() -> String {
    "local".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimensions() -> usize {
    256
}

fn default_batch_size() -> usize {
    32
}

fn default_embedding_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dimensions: default_embedding_dimensions(),
            base_url: None,
            batch_size: default_batch_size(),
            api_key_env: default_embedding_api_key_env(),
        }
    }
}

/// Chat-completion backend settings for RAG mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Without a generator only retrieval-only mode runs.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_generation_base_url")]
    pub base_url: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Retrieved passages included in the prompt.
    #[serde(default = "default_max_context_chunks")]
    pub max_context_chunks: usize,
    /// Environment variable holding the API key. Servers that ignore
    /// authentication get the placeholder `EMPTY`.
    #[serde(default = "default_generation_api_key_env")]
    pub api_key_env: String,
}

fn default_generation_base_url() -> String {
    "http://localhost:8000/v1".to_string()
}

fn default_generation_model() -> String {
    "TinyLlama/TinyLlama-1.1B-Chat-v1.0".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    512
}

fn default_max_context_chunks() -> usize {
    5
}

fn default_generation_api_key_env() -> String {
    "VLLM_API_KEY".to_string()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_generation_base_url(),
            model: default_generation_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_context_chunks: default_max_context_chunks(),
            api_key_env: default_generation_api_key_env(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Compute semantic precision/recall/F1 with the embedding service.
    #[serde(default)]
    pub semantic: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenizerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

fn default_true() -> bool {
    true
}

fn default_encoding() -> String {
    "cl100k_base".to_string()
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            encoding: default_encoding(),
        }
    }
}

/// Per-user config file, if the platform has a config directory.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "chunkbench", "chunkbench")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".chunkbench").join("config.toml")
}

/// Load configuration from all layers and validate it.
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&BenchConfig>,
) -> Result<BenchConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(BenchConfig::default()));

    // User-level config
    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // Environment variables (CHUNKBENCH_EXPERIMENT__TOP_K, CHUNKBENCH_EMBEDDING__PROVIDER, etc.)
    figment = figment.merge(Env::prefixed("CHUNKBENCH_").split("__"));

    // Explicit overrides
    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let config: BenchConfig = figment.extract().map_err(|e| ConfigError::Load {
        message: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}
