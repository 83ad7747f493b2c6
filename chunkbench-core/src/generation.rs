//! Answer generation for RAG mode.
//!
//! [`GenerationService`] is the seam; [`OpenAiCompatibleGenerator`] talks to
//! any server exposing `/chat/completions` (vLLM, OpenAI, llama.cpp) and
//! [`MockGenerator`] answers deterministically for tests.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::config::GenerationConfig;
use crate::error::GenerationError;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions based on \
the provided context. Use only the information from the context to answer.";

/// Produces an answer to `query` from retrieved passages.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn answer(&self, query: &str, context: &[String]) -> Result<String, GenerationError>;

    fn model_name(&self) -> &str;
}

/// Build the user prompt: numbered passages (at most `max_chunks`), then
/// the query.
pub fn build_rag_prompt(query: &str, context: &[String], max_chunks: usize) -> String {
    let passages = context
        .iter()
        .take(max_chunks)
        .enumerate()
        .map(|(i, chunk)| format!("[{}] {}", i + 1, chunk))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Context information is below:\n---\n{passages}\n---\n\n\
         Given the context information above, please answer the following query:\n\
         {query}\n\nAnswer:"
    )
}

/// Chat-completions client for OpenAI-compatible servers.
pub struct OpenAiCompatibleGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_context_chunks: usize,
}

impl OpenAiCompatibleGenerator {
    pub fn new(config: &GenerationConfig) -> Self {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .unwrap_or_else(|| "EMPTY".to_string());
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_context_chunks: config.max_context_chunks,
        }
    }

    fn request_body(&self, query: &str, context: &[String]) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_rag_prompt(query, context, self.max_context_chunks) },
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        })
    }
}

/// Pull `choices[0].message.content` out of a chat-completions response.
fn parse_completion(json: &serde_json::Value) -> Result<String, GenerationError> {
    let content = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| GenerationError::ResponseParse {
            message: "missing choices[0].message.content".into(),
        })?
        .trim();
    if content.is_empty() {
        return Err(GenerationError::EmptyAnswer);
    }
    Ok(content.to_string())
}

#[async_trait]
impl GenerationService for OpenAiCompatibleGenerator {
    async fn answer(&self, query: &str, context: &[String]) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(query, context))
            .send()
            .await
            .map_err(|e| GenerationError::Request {
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Request {
                message: format!("HTTP {status}: {body}"),
            });
        }

        let json: serde_json::Value =
            resp.json().await.map_err(|e| GenerationError::ResponseParse {
                message: e.to_string(),
            })?;
        let answer = parse_completion(&json)?;
        debug!(model = %self.model, chars = answer.len(), "Generated answer");
        Ok(answer)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// How a [`MockGenerator`] answers.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return the first context passage (empty context gives an empty answer).
    EchoContext,
    /// Always return this text.
    Fixed(String),
    /// Always fail with a request error.
    Fail,
    /// Sleep, then return this text.
    Delayed(Duration, String),
}

/// Deterministic generator for tests.
pub struct MockGenerator {
    behavior: MockBehavior,
    failing_queries: HashSet<String>,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            failing_queries: HashSet::new(),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Return the first retrieved passage as the answer.
    pub fn echo() -> Self {
        Self::new(MockBehavior::EchoContext)
    }

    pub fn with_response(text: &str) -> Self {
        Self::new(MockBehavior::Fixed(text.to_string()))
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Fail)
    }

    /// Fail only for these queries.
    pub fn fail_on<I, S>(mut self, queries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing_queries = queries.into_iter().map(Into::into).collect();
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Queries received so far, in call order.
    pub fn queries_seen(&self) -> Vec<String> {
        self.seen.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl GenerationService for MockGenerator {
    async fn answer(&self, query: &str, context: &[String]) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(query.to_string());
        }
        if self.failing_queries.contains(query) {
            return Err(GenerationError::Request {
                message: "mock failure".into(),
            });
        }
        match &self.behavior {
            MockBehavior::EchoContext => Ok(context.first().cloned().unwrap_or_default()),
            MockBehavior::Fixed(text) => Ok(text.clone()),
            MockBehavior::Fail => Err(GenerationError::Request {
                message: "mock failure".into(),
            }),
            MockBehavior::Delayed(delay, text) => {
                tokio::time::sleep(*delay).await;
                Ok(text.clone())
            }
        }
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}
