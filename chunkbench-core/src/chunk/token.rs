//! Token-window chunking.

use tracing::warn;

use super::fixed::chunk_fixed;
use crate::tokenizer::TokenCodec;

/// Characters per token assumed when no tokenizer is available.
pub const CHARS_PER_TOKEN: usize = 4;

/// Slide a window of `chunk_size` tokens with stride
/// `chunk_size - chunk_overlap`, decoding each window back to text.
///
/// Without a tokenizer, falls back to fixed-size character chunking at
/// [`CHARS_PER_TOKEN`] characters per token. A zero `chunk_size` yields no
/// chunks; `chunk_overlap >= chunk_size` yields only the first window.
pub(super) fn chunk_tokens(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    tokenizer: Option<&dyn TokenCodec>,
) -> Vec<String> {
    let Some(tokenizer) = tokenizer else {
        return chunk_fixed(
            text,
            chunk_size.saturating_mul(CHARS_PER_TOKEN),
            chunk_overlap.saturating_mul(CHARS_PER_TOKEN),
        );
    };

    if chunk_size == 0 {
        return Vec::new();
    }
    let tokens = tokenizer.encode(text);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < tokens.len() {
        let end = (start + chunk_size).min(tokens.len());
        match tokenizer.decode(&tokens[start..end]) {
            Ok(decoded) if !decoded.trim().is_empty() => chunks.push(decoded),
            Ok(_) => {}
            Err(e) => warn!(
                tokenizer = tokenizer.name(),
                start,
                end,
                error = %e,
                "Skipping token window with unknown ids"
            ),
        }
        if end >= tokens.len() || chunk_overlap >= chunk_size {
            break;
        }
        start += chunk_size - chunk_overlap;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TokenizerError;
    use std::sync::Mutex;

    /// One token per whitespace-separated word; decode joins with spaces.
    struct WordCodec {
        vocab: Mutex<Vec<String>>,
    }

    impl WordCodec {
        fn new() -> Self {
            Self {
                vocab: Mutex::new(Vec::new()),
            }
        }
    }

    impl TokenCodec for WordCodec {
        fn encode(&self, text: &str) -> Vec<u32> {
            let mut vocab = self.vocab.lock().unwrap();
            text.split_whitespace()
                .map(|word| match vocab.iter().position(|v| v == word) {
                    Some(id) => id as u32,
                    None => {
                        vocab.push(word.to_string());
                        (vocab.len() - 1) as u32
                    }
                })
                .collect()
        }

        fn decode(&self, tokens: &[u32]) -> Result<String, TokenizerError> {
            let vocab = self.vocab.lock().unwrap();
            tokens
                .iter()
                .map(|&t| {
                    vocab
                        .get(t as usize)
                        .cloned()
                        .ok_or_else(|| TokenizerError::Decode {
                            message: format!("unknown token {t}"),
                        })
                })
                .collect::<Result<Vec<_>, _>>()
                .map(|words| words.join(" "))
        }

        fn name(&self) -> &str {
            "words"
        }
    }

    #[test]
    fn test_token_windows_with_codec() {
        let codec = WordCodec::new();
        let chunks = chunk_tokens("a b c d e f g", 3, 1, Some(&codec));
        assert_eq!(chunks, vec!["a b c", "c d e", "e f g"]);
    }

    #[test]
    fn test_token_degenerate_overlap() {
        let codec = WordCodec::new();
        let chunks = chunk_tokens("a b c d e f g", 2, 2, Some(&codec));
        assert_eq!(chunks, vec!["a b"]);
    }

    #[test]
    fn test_token_fallback_uses_four_chars_per_token() {
        let text = "x".repeat(20);
        let chunks = chunk_tokens(&text, 2, 1, None);
        // Equivalent to fixed(8, 4).
        assert_eq!(chunks, vec!["x".repeat(8), "x".repeat(8), "x".repeat(8), "x".repeat(8)]);
        assert_eq!(chunks, chunk_fixed(&text, 8, 4));
    }

    #[test]
    fn test_token_with_tiktoken() {
        let codec = crate::tokenizer::TiktokenCodec::for_encoding("cl100k_base").unwrap();
        let text = "Chunking strategies change what a retriever can find. \
                    Token windows keep chunk sizes aligned with model limits.";
        let chunks = chunk_tokens(text, 8, 2, Some(&codec));
        assert!(chunks.len() > 1);
        assert!(chunks[0].starts_with("Chunking"));
        assert!(chunks.last().unwrap().ends_with("limits."));
        let total_tokens = codec.encode(text).len();
        assert_eq!(chunks.len(), (total_tokens - 2).div_ceil(6));
    }

    #[test]
    fn test_token_windows_keep_split_multibyte_characters() {
        let codec = crate::tokenizer::TiktokenCodec::for_encoding("cl100k_base").unwrap();
        let text = "Résumé naïve café 🙂🚀 北京大学 数学 Überprüfung Ωμέγα ".repeat(6);
        let tokens = codec.encode(&text);
        let chunks = chunk_tokens(&text, 7, 0, Some(&codec));
        assert_eq!(chunks.len(), tokens.len().div_ceil(7));
    }

    #[test]
    fn test_tiktoken_decode_accepts_any_token_slice() {
        let codec = crate::tokenizer::TiktokenCodec::for_encoding("cl100k_base").unwrap();
        let tokens = codec.encode("北京大学 🙂🚀 Ωμέγα");
        for end in 1..=tokens.len() {
            assert!(codec.decode(&tokens[..end]).is_ok());
            assert!(codec.decode(&tokens[end - 1..]).is_ok());
        }
        assert_eq!(codec.decode(&tokens).unwrap(), "北京大学 🙂🚀 Ωμέγα");
    }

    #[test]
    fn test_token_zero_size_yields_nothing() {
        let codec = WordCodec::new();
        assert!(chunk_tokens("a b c", 0, 0, Some(&codec)).is_empty());
        assert!(chunk_tokens("a b c", 0, 0, None).is_empty());
    }
}
