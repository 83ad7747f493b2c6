//! Property-based tests for chunking and metrics using proptest.

use proptest::prelude::*;

use chunkbench_core::chunk::{ChunkingStrategy, chunk_text};
use chunkbench_core::metrics::aggregate;
use chunkbench_core::metrics::retrieval::{hit_at_k, recall_at_k, reciprocal_rank};
use chunkbench_core::sentence::{RuleSentenceSplitter, SentenceSplitter};
use chunkbench_core::types::MetricMap;

// --- Fixed windows ---

proptest! {
    #[test]
    fn fixed_windows_reconstruct_text(
        text in "[a-z]{1,300}",
        size in 1usize..64,
        overlap_frac in 0usize..100,
    ) {
        let overlap = (size - 1) * overlap_frac / 100;
        let chunks = chunk_text(&text, ChunkingStrategy::Fixed, size, overlap);
        prop_assert!(!chunks.is_empty());

        let mut rebuilt = chunks[0].clone();
        for chunk in &chunks[1..] {
            let fresh: String = chunk.chars().skip(overlap).collect();
            rebuilt.push_str(&fresh);
        }
        prop_assert_eq!(rebuilt, text);
    }

    #[test]
    fn fixed_windows_respect_size(text in "[a-z ]{1,300}", size in 1usize..64) {
        for chunk in chunk_text(&text, ChunkingStrategy::Fixed, size, size / 3) {
            prop_assert!(chunk.chars().count() <= size);
            prop_assert!(!chunk.trim().is_empty());
        }
    }
}

// --- Recursive character fallback ---

proptest! {
    #[test]
    fn recursive_char_fallback_packs_full_windows(text in "[a-z]{1,200}", size in 1usize..40) {
        let chunks = chunk_text(&text, ChunkingStrategy::Recursive, size, 0);
        prop_assert_eq!(chunks.len(), text.len().div_ceil(size));
        prop_assert_eq!(chunks.concat(), text);
    }
}

// --- Sentence grouping ---

proptest! {
    #[test]
    fn sentence_chunks_preserve_order(
        sentences in prop::collection::vec("[A-Z][a-z]{3,8} [a-z]{3,8}[.!?]", 1..20),
        size in 10usize..120,
    ) {
        let text = sentences.join(" ");
        let chunks = chunk_text(&text, ChunkingStrategy::Sentence, size, 0);
        prop_assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn sentence_overlap_only_repeats_trailing_sentences(
        sentences in prop::collection::vec("[A-Z][a-z]{3,8} [a-z]{3,8}[.!?]", 1..20),
        size in 10usize..120,
        overlap_frac in 1usize..100,
    ) {
        // Number every sentence so overlap seeds can be located unambiguously.
        let text = sentences
            .iter()
            .enumerate()
            .map(|(i, s)| s.replacen(' ', &format!("{i} "), 1))
            .collect::<Vec<_>>()
            .join(" ");
        let overlap = size * overlap_frac / 100;
        let splitter = RuleSentenceSplitter::new();
        let expected = splitter.split(&text);

        let chunks = chunk_text(&text, ChunkingStrategy::Sentence, size, overlap);
        let mut recovered: Vec<String> = Vec::new();
        let mut previous: Vec<String> = Vec::new();
        for chunk in &chunks {
            let current = splitter.split(chunk);
            let carried = (0..=previous.len().min(current.len()))
                .rev()
                .find(|&k| current[..k] == previous[previous.len() - k..])
                .unwrap_or(0);
            prop_assert!(carried < current.len(), "chunk holds only carried sentences");
            let seed_len = current[..carried].join(" ").chars().count();
            prop_assert!(seed_len <= overlap);
            recovered.extend_from_slice(&current[carried..]);
            previous = current;
        }
        prop_assert_eq!(recovered, expected);
    }

    #[test]
    fn every_strategy_emits_non_blank_chunks(
        words in prop::collection::vec("[a-z]{1,10}", 1..80),
        size in 8usize..100,
    ) {
        let text = words.join(" ");
        for strategy in ChunkingStrategy::ALL {
            for chunk in chunk_text(&text, strategy, size, size / 4) {
                prop_assert!(!chunk.trim().is_empty(), "{} produced a blank chunk", strategy);
            }
        }
    }
}

// --- Rank metrics ---

fn ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("doc-{i}")).collect()
}

proptest! {
    #[test]
    fn recall_is_monotone_in_k(n in 1usize..20, relevant in 0usize..20, k in 1usize..20) {
        let retrieved = ids(n);
        let relevant = vec![format!("doc-{relevant}")];
        prop_assert!(recall_at_k(&retrieved, &relevant, k) <= recall_at_k(&retrieved, &relevant, k + 1));
    }

    #[test]
    fn rank_metrics_stay_in_unit_interval(n in 0usize..20, relevant in 0usize..25, k in 1usize..25) {
        let retrieved = ids(n);
        let relevant = vec![format!("doc-{relevant}")];
        for value in [
            recall_at_k(&retrieved, &relevant, k),
            hit_at_k(&retrieved, &relevant, k),
            reciprocal_rank(&retrieved, &relevant, k),
        ] {
            prop_assert!((0.0..=1.0).contains(&value));
        }
    }
}

// --- Aggregation ---

proptest! {
    #[test]
    fn aggregation_ignores_query_order(values in prop::collection::vec(0.0f64..1.0, 1..30)) {
        let maps: Vec<MetricMap> = values
            .iter()
            .map(|v| MetricMap::from([("mrr".to_string(), *v)]))
            .collect();
        let mut reversed = maps.clone();
        reversed.reverse();

        let forward = aggregate(maps.iter());
        let backward = aggregate(reversed.iter());
        prop_assert_eq!(&forward, &backward);

        let summary = forward["mrr"];
        prop_assert!(summary.min <= summary.median && summary.median <= summary.max);
        prop_assert!(summary.min - 1e-9 <= summary.mean && summary.mean <= summary.max + 1e-9);
        prop_assert!(summary.std >= 0.0);
    }
}
