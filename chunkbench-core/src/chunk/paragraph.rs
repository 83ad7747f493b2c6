//! Double-newline paragraphs with a character overlap prefix.

use super::tail_chars;

pub(super) const PARAGRAPH_SEPARATOR: &str = "\n\n";

pub(super) fn chunk_paragraphs(text: &str, chunk_overlap: usize) -> Vec<String> {
    let paragraphs: Vec<&str> = text
        .split(PARAGRAPH_SEPARATOR)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    if chunk_overlap == 0 {
        return paragraphs.into_iter().map(String::from).collect();
    }

    paragraphs
        .iter()
        .enumerate()
        .map(|(i, para)| match i.checked_sub(1).map(|prev| paragraphs[prev]) {
            None => para.to_string(),
            Some(prev) => format!(
                "{}{PARAGRAPH_SEPARATOR}{para}",
                tail_chars(prev, chunk_overlap)
            ),
        })
        .collect()
}
