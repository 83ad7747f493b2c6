//! Token codec collaborator for the token chunking strategy.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::TokenizerConfig;
use crate::error::TokenizerError;

/// Encodes text to token ids and back.
pub trait TokenCodec: Send + Sync {
    fn encode(&self, text: &str) -> Vec<u32>;

    /// Decode `tokens` to text. Byte sequences that are not valid UTF-8 on
    /// their own (a window boundary inside a multi-byte character) are
    /// replaced with U+FFFD rather than rejected. Errors are reserved for
    /// token ids the codec does not know.
    fn decode(&self, tokens: &[u32]) -> Result<String, TokenizerError>;

    /// Encoding name, for logs.
    fn name(&self) -> &str;
}

/// BPE codec backed by tiktoken-rs.
pub struct TiktokenCodec {
    bpe: tiktoken_rs::CoreBPE,
    name: String,
}

impl TiktokenCodec {
    /// Load one of the bundled encodings: `cl100k_base`, `o200k_base`,
    /// `p50k_base` or `r50k_base`.
    pub fn for_encoding(name: &str) -> Result<Self, TokenizerError> {
        let loaded = match name {
            "cl100k_base" => tiktoken_rs::cl100k_base(),
            "o200k_base" => tiktoken_rs::o200k_base(),
            "p50k_base" => tiktoken_rs::p50k_base(),
            "r50k_base" => tiktoken_rs::r50k_base(),
            _ => {
                return Err(TokenizerError::UnknownEncoding {
                    name: name.to_string(),
                });
            }
        };
        let bpe = loaded.map_err(|e| TokenizerError::Load {
            name: name.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            bpe,
            name: name.to_string(),
        })
    }

    pub fn count(&self, text: &str) -> usize {
        self.encode(text).len()
    }
}

impl std::fmt::Debug for TiktokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiktokenCodec").field("name", &self.name).finish()
    }
}

impl TokenCodec for TiktokenCodec {
    fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe.encode_with_special_tokens(text)
    }

    fn decode(&self, tokens: &[u32]) -> Result<String, TokenizerError> {
        match self.bpe.decode(tokens.to_vec()) {
            Ok(text) => Ok(text),
            // Every id resolved to bytes, but the window cuts through a
            // multi-byte character.
            Err(e) if e.to_string().contains("UTF-8") => {
                let bytes: Vec<u8> = self
                    .bpe
                    ._decode_native_and_split(tokens.to_vec())
                    .flatten()
                    .collect();
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            Err(e) => Err(TokenizerError::Decode {
                message: e.to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Build the configured codec. Returns `None` when disabled or when loading
/// fails, which selects the character-approximation fallback.
pub fn load_tokenizer(config: &TokenizerConfig) -> Option<Arc<dyn TokenCodec>> {
    if !config.enabled {
        info!("Tokenizer disabled, token strategy uses character approximation");
        return None;
    }
    match TiktokenCodec::for_encoding(&config.encoding) {
        Ok(codec) => Some(Arc::new(codec)),
        Err(e) => {
            warn!(
                encoding = %config.encoding,
                error = %e,
                "Could not load tokenizer, falling back to approximate token counting"
            );
            None
        }
    }
}
