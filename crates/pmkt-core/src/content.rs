//! # Canonical Content Bytes
//!
//! Defines `ContentBytes`, the sole input type for fingerprint computation
//! and the exact byte sequence handed to the blob store.
//!
//! ## Integrity Invariant
//!
//! No normalization is ever applied after hashing. Any transformation a
//! constructor performs (line-ending normalization for text) happens here,
//! once, and the resulting bytes are both fingerprinted and stored. A later
//! verification re-hashes the stored bytes verbatim and therefore agrees
//! with the registered fingerprint unless the blob itself changed.

use serde::{Deserialize, Serialize};

/// Content bytes in their canonical, as-stored representation.
///
/// # Invariants
///
/// - The inner `Vec<u8>` is private; construction goes through
///   [`ContentBytes::new()`] or [`ContentBytes::from_text()`].
/// - The bytes are never modified after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentBytes(Vec<u8>);

impl ContentBytes {
    /// Wrap raw bytes verbatim. Binary payloads (datasets, generated media)
    /// use this constructor.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Canonicalize text content.
    ///
    /// CRLF and lone CR line endings become LF so the same prompt pasted
    /// from different platforms produces one fingerprint. No other
    /// transformation is applied: whitespace, case, and Unicode form are
    /// preserved.
    pub fn from_text(text: &str) -> Self {
        let mut out = String::with_capacity(text.len());
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\r' {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push('\n');
            } else {
                out.push(c);
            }
        }
        Self(out.into_bytes())
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the wrapper, returning the canonical bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for ContentBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for ContentBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_keeps_bytes_verbatim() {
        let cb = ContentBytes::new(b"a\r\nb".to_vec());
        assert_eq!(cb.as_bytes(), b"a\r\nb");
        assert_eq!(cb.len(), 4);
    }

    #[test]
    fn from_text_normalizes_crlf() {
        let cb = ContentBytes::from_text("line one\r\nline two\r\n");
        assert_eq!(cb.as_bytes(), b"line one\nline two\n");
    }

    #[test]
    fn from_text_normalizes_lone_cr() {
        let cb = ContentBytes::from_text("a\rb\r");
        assert_eq!(cb.as_bytes(), b"a\nb\n");
    }

    #[test]
    fn from_text_preserves_whitespace_and_unicode() {
        let text = "  Résumé\tprompt  ";
        let cb = ContentBytes::from_text(text);
        assert_eq!(cb.as_bytes(), text.as_bytes());
    }

    #[test]
    fn crlf_and_lf_variants_are_equal() {
        assert_eq!(
            ContentBytes::from_text("x\r\ny"),
            ContentBytes::from_text("x\ny")
        );
    }

    #[test]
    fn empty_content() {
        let cb = ContentBytes::from_text("");
        assert!(cb.is_empty());
        assert_eq!(cb.into_bytes(), Vec::<u8>::new());
    }
}
