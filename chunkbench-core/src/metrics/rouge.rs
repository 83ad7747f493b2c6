//! ROUGE-1, ROUGE-2 and ROUGE-L F-measures.

use std::collections::HashMap;

/// Lowercase and split on anything that is not an ASCII letter or digit.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Precision, recall and F-measure of one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RougeScore {
    pub precision: f64,
    pub recall: f64,
    pub fmeasure: f64,
}

impl RougeScore {
    fn from_counts(matches: usize, prediction_total: usize, reference_total: usize) -> Self {
        let precision = matches as f64 / prediction_total.max(1) as f64;
        let recall = matches as f64 / reference_total.max(1) as f64;
        let fmeasure = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            precision,
            recall,
            fmeasure,
        }
    }
}

fn ngram_counts(tokens: &[String], n: usize) -> HashMap<&[String], usize> {
    let mut counts = HashMap::new();
    if n == 0 || tokens.len() < n {
        return counts;
    }
    for gram in tokens.windows(n) {
        *counts.entry(gram).or_insert(0) += 1;
    }
    counts
}

/// ROUGE-N with clipped n-gram overlap.
pub fn rouge_n(prediction: &[String], reference: &[String], n: usize) -> RougeScore {
    let pred = ngram_counts(prediction, n);
    let refs = ngram_counts(reference, n);
    let matches: usize = refs
        .iter()
        .map(|(gram, &count)| pred.get(gram).map_or(0, |&p| p.min(count)))
        .sum();
    RougeScore::from_counts(matches, pred.values().sum(), refs.values().sum())
}

fn lcs_len(a: &[String], b: &[String]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for x in a {
        for (j, y) in b.iter().enumerate() {
            curr[j + 1] = if x == y {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// ROUGE-L over the longest common subsequence.
pub fn rouge_l(prediction: &[String], reference: &[String]) -> RougeScore {
    let lcs = lcs_len(prediction, reference);
    RougeScore::from_counts(lcs, prediction.len(), reference.len())
}
