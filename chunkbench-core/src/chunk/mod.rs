//! Document chunking strategies.
//!
//! Five strategies turn a document's text into an ordered sequence of
//! non-empty spans:
//!
//! - `fixed`: sliding character window
//! - `recursive`: separator hierarchy with greedy packing and overlap
//! - `paragraph`: double-newline paragraphs with a character overlap prefix
//! - `token`: sliding window over a [`TokenCodec`] token sequence
//! - `sentence`: greedy sentence grouping with whole-sentence overlap
//!
//! All sizes and overlaps are measured in Unicode scalar values, not bytes.

mod fixed;
mod paragraph;
mod recursive;
mod sentence;
mod token;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::sentence::{RuleSentenceSplitter, SentenceSplitter};
use crate::tokenizer::TokenCodec;

pub use recursive::SEPARATORS;
pub use token::CHARS_PER_TOKEN;

/// Chunking strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ChunkingStrategy {
    Fixed,
    Recursive,
    Paragraph,
    Token,
    Sentence,
}

impl ChunkingStrategy {
    pub const ALL: [ChunkingStrategy; 5] = [
        ChunkingStrategy::Fixed,
        ChunkingStrategy::Recursive,
        ChunkingStrategy::Paragraph,
        ChunkingStrategy::Token,
        ChunkingStrategy::Sentence,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkingStrategy::Fixed => "fixed",
            ChunkingStrategy::Recursive => "recursive",
            ChunkingStrategy::Paragraph => "paragraph",
            ChunkingStrategy::Token => "token",
            ChunkingStrategy::Sentence => "sentence",
        }
    }

    /// Whether a zero `chunk_size` leaves this strategy with nothing to
    /// emit. Paragraph chunks ignore the size and sentence grouping degrades
    /// to one sentence per chunk.
    pub fn requires_chunk_size(&self) -> bool {
        matches!(
            self,
            ChunkingStrategy::Fixed | ChunkingStrategy::Recursive | ChunkingStrategy::Token
        )
    }
}

impl fmt::Display for ChunkingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkingStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(ChunkingStrategy::Fixed),
            "recursive" => Ok(ChunkingStrategy::Recursive),
            "paragraph" => Ok(ChunkingStrategy::Paragraph),
            "token" => Ok(ChunkingStrategy::Token),
            "sentence" => Ok(ChunkingStrategy::Sentence),
            _ => Err(ConfigError::UnknownStrategy {
                name: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for ChunkingStrategy {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ChunkingStrategy> for String {
    fn from(strategy: ChunkingStrategy) -> Self {
        strategy.as_str().to_string()
    }
}

/// A configured chunker: one strategy, its size parameters and the optional
/// collaborators the token and sentence strategies depend on.
#[derive(Clone)]
pub struct Chunker {
    strategy: ChunkingStrategy,
    chunk_size: usize,
    chunk_overlap: usize,
    tokenizer: Option<Arc<dyn TokenCodec>>,
    splitter: Arc<dyn SentenceSplitter>,
}

impl fmt::Debug for Chunker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunker")
            .field("strategy", &self.strategy)
            .field("chunk_size", &self.chunk_size)
            .field("chunk_overlap", &self.chunk_overlap)
            .field("tokenizer", &self.tokenizer.as_ref().map(|t| t.name().to_string()))
            .finish()
    }
}

impl Chunker {
    /// Create a chunker with the built-in sentence splitter and no tokenizer.
    pub fn new(strategy: ChunkingStrategy, chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            strategy,
            chunk_size,
            chunk_overlap,
            tokenizer: None,
            splitter: Arc::new(RuleSentenceSplitter::new()),
        }
    }

    /// Create a chunker from a strategy name, failing on unknown names.
    pub fn from_name(name: &str, chunk_size: usize, chunk_overlap: usize) -> Result<Self, ConfigError> {
        Ok(Self::new(name.parse()?, chunk_size, chunk_overlap))
    }

    /// Set the token codec used by the `token` strategy. `None` selects the
    /// character-approximation fallback.
    pub fn with_tokenizer(mut self, tokenizer: Option<Arc<dyn TokenCodec>>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Set the sentence splitter used by the `sentence` strategy.
    pub fn with_splitter(mut self, splitter: Arc<dyn SentenceSplitter>) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn strategy(&self) -> ChunkingStrategy {
        self.strategy
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn has_tokenizer(&self) -> bool {
        self.tokenizer.is_some()
    }

    /// Chunk `text`. Empty or whitespace-only input yields no chunks.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        match self.strategy {
            ChunkingStrategy::Fixed => fixed::chunk_fixed(text, self.chunk_size, self.chunk_overlap),
            ChunkingStrategy::Recursive => {
                recursive::chunk_recursive(text, self.chunk_size, self.chunk_overlap)
            }
            ChunkingStrategy::Paragraph => paragraph::chunk_paragraphs(text, self.chunk_overlap),
            ChunkingStrategy::Token => token::chunk_tokens(
                text,
                self.chunk_size,
                self.chunk_overlap,
                self.tokenizer.as_deref(),
            ),
            ChunkingStrategy::Sentence => sentence::chunk_sentences(
                text,
                self.chunk_size,
                self.chunk_overlap,
                self.splitter.as_ref(),
            ),
        }
    }
}

/// Chunk text using the specified strategy and default collaborators.
pub fn chunk_text(
    text: &str,
    strategy: ChunkingStrategy,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<String> {
    Chunker::new(strategy, chunk_size, chunk_overlap).chunk(text)
}

/// Whether any chunk is longer than `limit` characters.
pub fn any_chunk_exceeds(chunks: &[String], limit: usize) -> bool {
    chunks.iter().any(|c| char_len(c) > limit)
}

pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// The trailing `n` characters of `s` (all of `s` when it is shorter).
pub(crate) fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}
