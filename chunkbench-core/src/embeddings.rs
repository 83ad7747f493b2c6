//! Pluggable embedding providers.
//!
//! Provides an async trait over embedding models, with implementations for a
//! local hashed term-frequency model (always available, deterministic), the
//! OpenAI embeddings API and the Ollama embed API.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::EmbeddingConfig;
use crate::error::{ConfigError, EmbeddingError};

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Embed a batch of texts. Returns one unit-length vector per input, in
    /// input order. Identical inputs yield identical vectors.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Dimensionality of returned vectors.
    fn dimensions(&self) -> usize;

    fn provider_name(&self) -> &str;
}

/// Divide `vector` by its L2 norm. Zero vectors are left unchanged.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

/// Hashed term-frequency embedder.
#[derive(Debug, Clone)]
pub struct LocalEmbedder {
    dimensions: usize,
}

impl LocalEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        if words.is_empty() {
            return vector;
        }

        // Count term frequency
        let mut tf: HashMap<&str, usize> = HashMap::new();
        for word in &words {
            *tf.entry(word).or_insert(0) += 1;
        }

        for (term, count) in &tf {
            let idx = simple_hash(term) % self.dimensions;
            vector[idx] += *count as f32;
        }

        l2_normalize(&mut vector);
        vector
    }
}

/// djb2 string hash.
fn simple_hash(s: &str) -> usize {
    let mut hash: usize = 5381;
    for b in s.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(b as usize);
    }
    hash
}

#[async_trait]
impl EmbeddingService for LocalEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &str {
        "local"
    }
}

/// OpenAI-compatible embeddings API (`POST {base_url}/v1/embeddings`).
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dims: usize,
    base_url: String,
    batch_size: usize,
}

impl OpenAiEmbedder {
    pub fn new(api_key: String, config: &EmbeddingConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: config.model.clone(),
            dims: config.dimensions,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com".into()),
            batch_size: config.batch_size.max(1),
        }
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/v1/embeddings", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "input": batch,
            "dimensions": self.dims,
        });

        let json = post_json(self.client.post(&url).bearer_auth(&self.api_key).json(&body)).await?;
        let data = json["data"]
            .as_array()
            .ok_or_else(|| EmbeddingError::ResponseParse {
                message: "missing 'data' array".into(),
            })?;

        let mut indexed = data
            .iter()
            .enumerate()
            .map(|(pos, item)| {
                let index = item["index"].as_u64().map_or(pos, |i| i as usize);
                parse_vector(&item["embedding"]).map(|v| (index, v))
            })
            .collect::<Result<Vec<_>, _>>()?;
        indexed.sort_by_key(|(index, _)| *index);

        Ok(indexed.into_iter().map(|(_, v)| v).collect())
    }
}

#[async_trait]
impl EmbeddingService for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let embedded = self.embed_batch(batch).await?;
            check_batch(batch.len(), &embedded, Some(self.dims))?;
            vectors.extend(embedded);
        }
        debug!(count = vectors.len(), model = %self.model, "Embedded texts via OpenAI");
        Ok(finish(vectors))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}

/// Ollama embed API (`POST {base_url}/api/embed`).
pub struct OllamaEmbedder {
    client: reqwest::Client,
    model: String,
    dims: usize,
    base_url: String,
    batch_size: usize,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Self {
        let model = if config.model.starts_with("text-embedding-") {
            "nomic-embed-text".to_string()
        } else {
            config.model.clone()
        };
        let dims = match model.as_str() {
            "nomic-embed-text" => 768,
            "mxbai-embed-large" => 1024,
            "all-minilm" => 384,
            _ => config.dimensions,
        };
        Self {
            client: reqwest::Client::new(),
            model,
            dims,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| "http://localhost:11434".into()),
            batch_size: config.batch_size.max(1),
        }
    }
}

#[async_trait]
impl EmbeddingService for OllamaEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/api/embed", self.base_url.trim_end_matches('/'));
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let body = serde_json::json!({
                "model": self.model,
                "input": batch,
            });
            let json = post_json(self.client.post(&url).json(&body)).await?;
            let embedded = json["embeddings"]
                .as_array()
                .ok_or_else(|| EmbeddingError::ResponseParse {
                    message: "missing 'embeddings' array".into(),
                })?
                .iter()
                .map(parse_vector)
                .collect::<Result<Vec<_>, _>>()?;
            check_batch(batch.len(), &embedded, None)?;
            vectors.extend(embedded);
        }
        debug!(count = vectors.len(), model = %self.model, "Embedded texts via Ollama");
        Ok(finish(vectors))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }
}

async fn post_json(request: reqwest::RequestBuilder) -> Result<serde_json::Value, EmbeddingError> {
    let resp = request.send().await.map_err(|e| EmbeddingError::Request {
        message: e.to_string(),
    })?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(EmbeddingError::Request {
            message: format!("HTTP {status}: {body}"),
        });
    }
    resp.json::<serde_json::Value>()
        .await
        .map_err(|e| EmbeddingError::ResponseParse {
            message: e.to_string(),
        })
}

fn parse_vector(value: &serde_json::Value) -> Result<Vec<f32>, EmbeddingError> {
    value
        .as_array()
        .ok_or_else(|| EmbeddingError::ResponseParse {
            message: "embedding is not an array".into(),
        })?
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| EmbeddingError::ResponseParse {
                    message: "embedding contains a non-number".into(),
                })
        })
        .collect()
}

/// Every batch must return one vector per input, all of one width.
fn check_batch(
    expected: usize,
    vectors: &[Vec<f32>],
    dims: Option<usize>,
) -> Result<(), EmbeddingError> {
    if vectors.len() != expected {
        return Err(EmbeddingError::CountMismatch {
            expected,
            got: vectors.len(),
        });
    }
    let width = dims.or_else(|| vectors.first().map(Vec::len)).unwrap_or(0);
    if let Some(bad) = vectors.iter().find(|v| v.len() != width) {
        return Err(EmbeddingError::DimensionMismatch {
            expected: width,
            got: bad.len(),
        });
    }
    Ok(())
}

fn finish(mut vectors: Vec<Vec<f32>>) -> Vec<Vec<f32>> {
    for v in &mut vectors {
        l2_normalize(v);
    }
    vectors
}

fn resolve_api_key(env_var: &str) -> Option<String> {
    std::env::var(env_var).ok().filter(|k| !k.trim().is_empty())
}

/// Create an embedding service from configuration.
///
/// An unknown provider is a configuration error. A missing API key for
/// `openai` falls back to the local embedder with a warning.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingService>, ConfigError> {
    match config.provider.as_str() {
        "local" => Ok(Arc::new(LocalEmbedder::new(config.dimensions))),
        "openai" => match resolve_api_key(&config.api_key_env) {
            Some(api_key) => Ok(Arc::new(OpenAiEmbedder::new(api_key, config))),
            None => {
                warn!(
                    env_var = %config.api_key_env,
                    "API key not set, falling back to local embedder"
                );
                Ok(Arc::new(LocalEmbedder::new(config.dimensions)))
            }
        },
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(config))),
        other => Err(ConfigError::UnknownProvider {
            name: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_embedder_dimensions() {
        let embedder = LocalEmbedder::new(128);
        assert_eq!(embedder.dimensions(), 128);
        assert_eq!(embedder.embed_one("hello world").len(), 128);
    }

    #[test]
    fn test_local_embedder_normalized() {
        let embedder = LocalEmbedder::new(128);
        let v = embedder.embed_one("test input text for normalization");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01, "Expected normalized vector, got norm={norm}");
    }

    #[test]
    fn test_local_embedder_empty_text() {
        let embedder = LocalEmbedder::new(64);
        let v = embedder.embed_one("  ,;  ");
        assert_eq!(v.len(), 64);
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_local_embedder_batch_is_deterministic() {
        let embedder = LocalEmbedder::new(256);
        let texts = vec!["chunking matters".to_string(), "chunking matters".to_string()];
        let vectors = embedder.embed(&texts).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vectors[1]);
        assert_eq!(vectors[0], embedder.embed_one("chunking matters"));
    }

    #[test]
    fn test_l2_normalize_zero_vector() {
        let mut v = vec![0.0f32; 4];
        l2_normalize(&mut v);
        assert!(v.iter().all(|&x| x == 0.0));

        let mut w = vec![3.0f32, 4.0];
        l2_normalize(&mut w);
        assert!((w[0] - 0.6).abs() < 1e-6);
        assert!((w[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_check_batch_mismatches() {
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        assert!(check_batch(2, &vectors, Some(2)).is_ok());
        assert!(matches!(
            check_batch(3, &vectors, Some(2)),
            Err(EmbeddingError::CountMismatch { expected: 3, got: 2 })
        ));
        assert!(matches!(
            check_batch(2, &vectors, Some(3)),
            Err(EmbeddingError::DimensionMismatch { expected: 3, got: 2 })
        ));
        let ragged = vec![vec![1.0, 0.0], vec![1.0]];
        assert!(check_batch(2, &ragged, None).is_err());
    }

    #[test]
    fn test_parse_vector_rejects_garbage() {
        let ok = parse_vector(&serde_json::json!([0.5, 1])).unwrap();
        assert_eq!(ok, vec![0.5, 1.0]);
        assert!(parse_vector(&serde_json::json!("nope")).is_err());
        assert!(parse_vector(&serde_json::json!([0.5, "x"])).is_err());
    }

    #[test]
    fn test_create_embedder_providers() {
        let local = create_embedder(&EmbeddingConfig::default()).unwrap();
        assert_eq!(local.provider_name(), "local");
        assert_eq!(local.dimensions(), 256);

        let ollama = create_embedder(&EmbeddingConfig {
            provider: "ollama".into(),
            model: "nomic-embed-text".into(),
            ..EmbeddingConfig::default()
        })
        .unwrap();
        assert_eq!(ollama.provider_name(), "ollama");
        assert_eq!(ollama.dimensions(), 768);

        let missing_key = create_embedder(&EmbeddingConfig {
            provider: "openai".into(),
            api_key_env: "CHUNKBENCH_TEST_UNSET_KEY_VAR".into(),
            ..EmbeddingConfig::default()
        })
        .unwrap();
        assert_eq!(missing_key.provider_name(), "local");

        let err = create_embedder(&EmbeddingConfig {
            provider: "word2vec".into(),
            ..EmbeddingConfig::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, ConfigError::UnknownProvider { .. }));
    }
}
