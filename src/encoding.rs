//! Text encoding for blob columns
//!
//! Text layer contents and dataset comments are stored as base64 of their
//! UTF-8 bytes. Older documents may hold the raw text instead.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Encode text for a blob column
pub fn encode_text(text: &str) -> Vec<u8> {
    STANDARD.encode(text.as_bytes()).into_bytes()
}

/// Decode a blob column back to text.
///
/// Falls back to reading the bytes as (lossy) UTF-8 when they are not base64
/// of valid UTF-8. Raw legacy text that happens to be valid base64 of UTF-8,
/// such as `TWFu`, cannot be told apart and decodes (here to `Man`).
pub fn decode_text(bytes: &[u8]) -> String {
    let trimmed = bytes.trim_ascii();
    STANDARD
        .decode(trimmed)
        .ok()
        .and_then(|decoded| String::from_utf8(decoded).ok())
        .unwrap_or_else(|| String::from_utf8_lossy(bytes).into_owned())
}

/// Decode an optional comments blob, treating empty text as absent
pub fn decode_comments(bytes: Option<&[u8]>) -> Option<String> {
    bytes.map(decode_text).filter(|text| !text.is_empty())
}
