//! Raw bytes to plain text.

use unicode_normalization::UnicodeNormalization;

/// Converts a document's raw payload into plain text. Returns an empty string
/// when nothing usable could be extracted.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, raw: &[u8]) -> String;
}

/// Extractor for text payloads.
///
/// Decodes UTF-8 lossily, normalizes line endings to `\n`, applies NFC and
/// drops control characters other than newline and tab.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, raw: &[u8]) -> String {
        let decoded = String::from_utf8_lossy(raw);
        let unified = decoded.replace("\r\n", "\n").replace('\r', "\n");
        unified
            .nfc()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
            .collect()
    }
}
