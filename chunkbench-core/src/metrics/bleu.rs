//! Sentence-level BLEU on a 0-100 scale.
//!
//! Tokenization follows the WMT `13a` rules. Zero n-gram matches are
//! smoothed exponentially and the n-gram order is capped at the longest
//! order the hypothesis actually has.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

pub const MAX_NGRAM_ORDER: usize = 4;

static TOKENIZE_13A: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        // Punctuation and symbols become their own tokens.
        (r"([{-~\[-` -&(-+:-@/])", " ${1} "),
        // Periods and commas unless preceded by a digit.
        (r"([^0-9])([\.,])", "${1} ${2} "),
        // Periods and commas unless followed by a digit.
        (r"([\.,])([^0-9])", " ${1} ${2}"),
        // Dash preceded by a digit.
        (r"([0-9])(-)", "${1} ${2} "),
    ]
    .into_iter()
    .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, replacement)))
    .collect()
});

/// Split `text` into tokens using the `13a` rules.
pub fn tokenize_13a(text: &str) -> Vec<String> {
    let mut line = text
        .replace("<skipped>", "")
        .replace("-\n", "")
        .replace('\n', " ");
    if line.contains('&') {
        line = line
            .replace("&quot;", "\"")
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">");
    }
    let mut padded = format!(" {line} ");
    for (re, replacement) in TOKENIZE_13A.iter() {
        padded = re.replace_all(&padded, *replacement).into_owned();
    }
    padded.split_whitespace().map(String::from).collect()
}

fn ngram_counts(tokens: &[String], n: usize) -> HashMap<&[String], usize> {
    let mut counts = HashMap::new();
    if tokens.len() >= n {
        for gram in tokens.windows(n) {
            *counts.entry(gram).or_insert(0) += 1;
        }
    }
    counts
}

/// Sentence BLEU of `hypothesis` against a single `reference`.
pub fn sentence_bleu(hypothesis: &str, reference: &str) -> f64 {
    let hyp = tokenize_13a(hypothesis);
    let refs = tokenize_13a(reference);
    let sys_len = hyp.len();
    let ref_len = refs.len();
    if sys_len == 0 {
        return 0.0;
    }

    let mut precisions = [0.0f64; MAX_NGRAM_ORDER];
    let mut effective_order = 0;
    let mut smooth = 1.0f64;

    for n in 1..=MAX_NGRAM_ORDER {
        let hyp_counts = ngram_counts(&hyp, n);
        let total: usize = hyp_counts.values().sum();
        if total == 0 {
            break;
        }
        effective_order = n;

        let ref_counts = ngram_counts(&refs, n);
        let correct: usize = hyp_counts
            .iter()
            .map(|(gram, &count)| ref_counts.get(gram).map_or(0, |&r| r.min(count)))
            .sum();

        precisions[n - 1] = if correct == 0 {
            smooth *= 2.0;
            100.0 / (smooth * total as f64)
        } else {
            100.0 * correct as f64 / total as f64
        };
    }

    let brevity_penalty = if sys_len >= ref_len {
        1.0
    } else {
        (1.0 - ref_len as f64 / sys_len as f64).exp()
    };

    let log_sum: f64 = precisions[..effective_order].iter().map(|p| p.ln()).sum();
    brevity_penalty * (log_sum / effective_order as f64).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_13a_splits_punctuation() {
        assert_eq!(
            tokenize_13a("Hello, world. It costs $3.50 (approx)!"),
            vec!["Hello", ",", "world", ".", "It", "costs", "$", "3.50", "(", "approx", ")", "!"]
        );
    }

    #[test]
    fn test_tokenize_13a_unescapes_entities() {
        assert_eq!(tokenize_13a("a &amp; b"), vec!["a", "&", "b"]);
    }

    #[test]
    fn test_identical_sentences_score_100() {
        let s = "the quick brown fox jumps over the lazy dog";
        assert!((sentence_bleu(s, s) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_hypothesis_scores_zero() {
        assert_eq!(sentence_bleu("", "a reference sentence"), 0.0);
    }

    #[test]
    fn test_no_overlap_is_small_but_positive() {
        let score = sentence_bleu("alpha beta gamma delta", "one two three four");
        assert!(score > 0.0);
        assert!(score < 10.0);
    }

    #[test]
    fn test_effective_order_for_short_hypothesis() {
        // Two tokens: only unigrams and bigrams exist, both fully matched.
        assert!((sentence_bleu("hello world", "hello world") - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_brevity_penalty_applies() {
        let reference = "the cat sat on the mat today";
        let short = sentence_bleu("the cat sat", reference);
        assert!(short < 100.0);
        let expected_bp = (1.0f64 - 7.0 / 3.0).exp();
        assert!((short - 100.0 * expected_bp).abs() < 1e-6);
    }
}
