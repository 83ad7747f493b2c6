//! Rule-based sentence boundary detection.
//!
//! Boundary data is built once per process by [`initialize`]. Calling it is
//! idempotent and safe from any thread; [`RuleSentenceSplitter::new`] calls it
//! too, so a splitter always sees initialized data.

use std::collections::HashSet;
use std::sync::OnceLock;

use tracing::debug;

/// Splits text into sentences.
pub trait SentenceSplitter: Send + Sync {
    /// Sentences in document order, each trimmed and non-empty.
    fn split(&self, text: &str) -> Vec<String>;
}

const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "etc", "e.g", "i.e", "fig", "figs",
    "eq", "eqs", "al", "no", "nos", "vol", "vols", "approx", "cf", "ch", "sec", "secs", "pp",
    "ed", "eds", "inc", "ltd", "co", "corp", "dept", "univ", "jan", "feb", "mar", "apr", "jun",
    "jul", "aug", "sep", "sept", "oct", "nov", "dec", "ref", "refs", "resp", "viz", "ca",
];

const TERMINALS: &[char] = &['.', '!', '?'];
const CLOSERS: &[char] = &['"', '\'', ')', ']', '}', '\u{201d}', '\u{2019}'];
const OPENERS: &[char] = &['"', '\'', '(', '[', '{', '\u{201c}', '\u{2018}'];

/// Process-wide boundary data.
#[derive(Debug)]
pub struct SentenceData {
    abbreviations: HashSet<&'static str>,
}

impl SentenceData {
    fn build() -> Self {
        let abbreviations: HashSet<&'static str> = ABBREVIATIONS.iter().copied().collect();
        debug!(abbreviations = abbreviations.len(), "Sentence boundary data initialized");
        Self { abbreviations }
    }

    pub fn is_abbreviation(&self, word: &str) -> bool {
        self.abbreviations.contains(word.to_lowercase().as_str())
    }
}

static SENTENCE_DATA: OnceLock<SentenceData> = OnceLock::new();

/// Build the sentence boundary data if it has not been built yet.
pub fn initialize() -> &'static SentenceData {
    SENTENCE_DATA.get_or_init(SentenceData::build)
}

pub fn is_initialized() -> bool {
    SENTENCE_DATA.get().is_some()
}

/// Terminal punctuation splitter with an abbreviation list.
///
/// A run of `.`, `!` or `?` (plus any closing quotes or brackets) followed by
/// whitespace or the end of text ends a sentence, except when a `.` follows a
/// known abbreviation or the next word starts with a lowercase letter.
#[derive(Debug, Clone, Copy)]
pub struct RuleSentenceSplitter {
    data: &'static SentenceData,
}

impl RuleSentenceSplitter {
    pub fn new() -> Self {
        Self { data: initialize() }
    }

    fn is_boundary(&self, chars: &[(usize, char)], first: usize, last: usize) -> bool {
        let followed_by_break = chars
            .get(last + 1)
            .is_none_or(|&(_, c)| c.is_whitespace());
        if !followed_by_break {
            return false;
        }
        if chars[first].1 != '.' {
            return true;
        }

        // Word immediately before the period.
        let word_start = chars[..first]
            .iter()
            .rposition(|&(_, c)| c.is_whitespace())
            .map_or(0, |p| p + 1);
        let word: String = chars[word_start..first]
            .iter()
            .map(|&(_, c)| c)
            .skip_while(|c| OPENERS.contains(c))
            .collect();
        if self.data.is_abbreviation(&word) {
            return false;
        }

        let next = chars[last + 1..]
            .iter()
            .map(|&(_, c)| c)
            .find(|c| !c.is_whitespace());
        !next.is_some_and(char::is_lowercase)
    }
}

impl Default for RuleSentenceSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl SentenceSplitter for RuleSentenceSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let mut sentences = Vec::new();
        let mut start_byte = 0;
        let mut i = 0;

        let mut push = |s: &str| {
            let s = s.trim();
            if !s.is_empty() {
                sentences.push(s.to_string());
            }
        };

        while i < chars.len() {
            if !TERMINALS.contains(&chars[i].1) {
                i += 1;
                continue;
            }
            let first = i;
            let mut last = i;
            while last + 1 < chars.len() && TERMINALS.contains(&chars[last + 1].1) {
                last += 1;
            }
            while last + 1 < chars.len() && CLOSERS.contains(&chars[last + 1].1) {
                last += 1;
            }

            if self.is_boundary(&chars, first, last) {
                let (idx, c) = chars[last];
                let end_byte = idx + c.len_utf8();
                push(&text[start_byte..end_byte]);
                start_byte = end_byte;
            }
            i = last + 1;
        }
        push(&text[start_byte..]);

        sentences
    }
}
