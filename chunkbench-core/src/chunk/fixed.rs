//! Sliding character window.

/// Chunk `text` into windows of `chunk_size` characters advancing by
/// `chunk_size - chunk_overlap`.
///
/// The walk ends once a window reaches the end of the text, so the tail is
/// never re-emitted as a shorter window already covered by its predecessor.
/// When `chunk_overlap >= chunk_size` only the first window is produced, and
/// a zero `chunk_size` produces nothing.
pub(super) fn chunk_fixed(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    if chunk_size == 0 {
        return Vec::new();
    }
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < len {
        let end = (start + chunk_size).min(len);
        let window: String = chars[start..end].iter().collect();
        if !window.trim().is_empty() {
            chunks.push(window);
        }
        if end >= len || chunk_overlap >= chunk_size {
            break;
        }
        start += chunk_size - chunk_overlap;
    }

    chunks
}
