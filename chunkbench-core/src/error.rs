//! Error types for the chunkbench core library.
//!
//! Uses `thiserror` for public API error types. Each collaborator boundary
//! (configuration, extraction, embedding, generation, retrieval, storage) has
//! its own enum so callers can decide which failures abort a strategy and
//! which only degrade a single query or document.

use std::path::PathBuf;

/// Top-level error type for the chunkbench core library.
#[derive(Debug, thiserror::Error)]
pub enum ChunkbenchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Tokenizer error: {0}")]
    Tokenizer(#[from] TokenizerError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from configuration and strategy selection.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown chunking strategy: {name}")]
    UnknownStrategy { name: String },

    #[error("Unknown embedding provider: {name}")]
    UnknownProvider { name: String },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration load failed: {message}")]
    Load { message: String },
}

/// Errors from turning a document's raw bytes into plain text.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("No raw payload for document {document_id}")]
    MissingPayload { document_id: String },

    #[error("Extraction produced no text for document {document_id}")]
    EmptyText { document_id: String },
}

/// Errors from the token codec collaborator.
#[derive(Debug, thiserror::Error)]
pub enum TokenizerError {
    #[error("Unknown token encoding: {name}")]
    UnknownEncoding { name: String },

    #[error("Failed to load token encoding {name}: {message}")]
    Load { name: String, message: String },

    #[error("Token decode failed: {message}")]
    Decode { message: String },
}

/// Errors from the embedding collaborator.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Embedding request failed: {message}")]
    Request { message: String },

    #[error("Embedding response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Embedding count mismatch: expected {expected}, got {got}")]
    CountMismatch { expected: usize, got: usize },

    #[error("Embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Errors from the generation collaborator.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Generation request failed: {message}")]
    Request { message: String },

    #[error("Generation response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Generation timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Generation returned an empty answer")]
    EmptyAnswer,
}

/// Errors from nearest-neighbor retrieval.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("k must be at least 1")]
    InvalidK,

    #[error("Vector dimension mismatch: query has {query}, candidate {index} has {candidate}")]
    DimensionMismatch {
        query: usize,
        candidate: usize,
        index: usize,
    },
}

/// Errors from document stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Catalog not found: {path}")]
    CatalogNotFound { path: PathBuf },

    #[error("Catalog parse error in {path}: {message}")]
    CatalogParse { path: PathBuf, message: String },

    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A type alias for results using the top-level `ChunkbenchError`.
pub type Result<T> = std::result::Result<T, ChunkbenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config() {
        let err = ChunkbenchError::Config(ConfigError::UnknownStrategy {
            name: "semantic".into(),
        });
        assert_eq!(
            err.to_string(),
            "Configuration error: Unknown chunking strategy: semantic"
        );
    }

    #[test]
    fn test_error_display_embedding() {
        let err = ChunkbenchError::Embedding(EmbeddingError::CountMismatch {
            expected: 10,
            got: 9,
        });
        assert_eq!(
            err.to_string(),
            "Embedding error: Embedding count mismatch: expected 10, got 9"
        );
    }

    #[test]
    fn test_generation_error_variants() {
        let err = GenerationError::Timeout { timeout_secs: 30 };
        assert_eq!(err.to_string(), "Generation timed out after 30s");
        assert_eq!(
            GenerationError::EmptyAnswer.to_string(),
            "Generation returned an empty answer"
        );
    }

    #[test]
    fn test_retrieval_error_display() {
        let err = RetrievalError::DimensionMismatch {
            query: 3,
            candidate: 4,
            index: 7,
        };
        assert_eq!(
            err.to_string(),
            "Vector dimension mismatch: query has 3, candidate 7 has 4"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ChunkbenchError = io_err.into();
        assert!(matches!(err, ChunkbenchError::Io(_)));
    }

    #[test]
    fn test_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: ChunkbenchError = serde_err.into();
        assert!(matches!(err, ChunkbenchError::Serialization(_)));
    }
}
