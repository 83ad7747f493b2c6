//! Separator-hierarchy chunking with greedy packing.

use super::{char_len, tail_chars};

/// Separators in priority order. The empty separator splits into single
/// characters and always matches.
pub const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// Pick the first separator present in `text`.
fn choose_separator(text: &str) -> &'static str {
    SEPARATORS
        .iter()
        .copied()
        .find(|sep| sep.is_empty() || text.contains(sep))
        .unwrap_or("")
}

fn split_pieces<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        text.char_indices()
            .map(|(idx, c)| &text[idx..idx + c.len_utf8()])
            .collect()
    } else {
        text.split(separator).collect()
    }
}

/// Split on the highest-priority separator present, then pack pieces into
/// buffers of at most `chunk_size` characters. Each flushed buffer seeds the
/// next with its trailing `chunk_overlap` characters.
///
/// Pieces longer than `chunk_size` are not split further; they are emitted
/// whole.
pub(super) fn chunk_recursive(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let separator = choose_separator(text);
    let sep_len = char_len(separator);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    let mut previous: Option<String> = None;

    for piece in split_pieces(text, separator) {
        let piece_len = char_len(piece);
        if current_len + piece_len + sep_len <= chunk_size {
            current.push_str(piece);
            current.push_str(separator);
            current_len += piece_len + sep_len;
            continue;
        }

        let trimmed = current.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
            previous = Some(std::mem::take(&mut current));
        }

        current = match previous.as_deref() {
            Some(prev) if chunk_overlap > 0 => tail_chars(prev, chunk_overlap).to_string(),
            _ => String::new(),
        };
        current.push_str(piece);
        current.push_str(separator);
        current_len = char_len(&current);
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }

    chunks
}
