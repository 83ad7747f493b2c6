//! Greedy sentence grouping with whole-sentence overlap.

use super::char_len;
use crate::sentence::SentenceSplitter;

/// Group sentences into chunks of roughly `chunk_size` characters.
///
/// A zero `chunk_size` puts every sentence in its own chunk.
///
/// A chunk is flushed before the sentence that would push it past
/// `chunk_size`. The next chunk is seeded with the longest run of trailing
/// sentences from the flushed chunk whose joined length fits in
/// `chunk_overlap`.
pub(super) fn chunk_sentences(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
    splitter: &dyn SentenceSplitter,
) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    // Includes one joining space per sentence.
    let mut current_size = 0usize;

    for sentence in splitter.split(text) {
        let sentence_len = char_len(&sentence);

        if current_size + sentence_len > chunk_size && !current.is_empty() {
            chunks.push(current.join(" "));

            if chunk_overlap > 0 {
                let (seed, seed_len) = overlap_seed(&current, chunk_overlap);
                current = seed;
                current_size = seed_len;
            } else {
                current.clear();
                current_size = 0;
            }
        }

        current.push(sentence);
        current_size += sentence_len + 1;
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks
}

/// Walk `sentences` from the end, keeping whole sentences while the joined
/// seed plus the next candidate stays within `limit`.
fn overlap_seed(sentences: &[String], limit: usize) -> (Vec<String>, usize) {
    let mut seed: Vec<String> = Vec::new();
    let mut seed_len = 0usize;

    for sentence in sentences.iter().rev() {
        let joined = if seed.is_empty() {
            char_len(sentence)
        } else {
            seed_len + 1 + char_len(sentence)
        };
        if joined > limit {
            break;
        }
        seed.insert(0, sentence.clone());
        seed_len = joined;
    }

    (seed, seed_len)
}
