//! # Content Digest — Content Fingerprints
//!
//! Defines `ContentDigest` and `DigestAlgorithm`, the fixed-length content
//! address every listing is bound to.
//!
//! ## Security Invariant
//!
//! `ContentDigest` is computed only from `ContentBytes` via [`fingerprint()`].
//! The function is pure: no I/O, no clock, no global state. Determinism is
//! covered by the property tests in `tests/fingerprint_properties.rs`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::content::ContentBytes;
use crate::error::MarketError;

/// The hash algorithm used to produce a content digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// SHA-256.
    Sha256,
}

impl DigestAlgorithm {
    /// Returns the algorithm identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A content fingerprint with its algorithm tag.
///
/// The 32-byte digest and algorithm tag together form a self-describing
/// content address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest {
    /// The hash algorithm that produced this digest.
    pub algorithm: DigestAlgorithm,
    /// The raw 32-byte digest value.
    pub bytes: [u8; 32],
}

impl ContentDigest {
    /// Create a new content digest from raw bytes and algorithm.
    ///
    /// Prefer [`fingerprint()`] for computing digests of content.
    pub fn new(algorithm: DigestAlgorithm, bytes: [u8; 32]) -> Self {
        Self { algorithm, bytes }
    }

    /// Parse a SHA-256 digest from 64 hex characters (case-insensitive).
    /// A leading `sha256:` tag is accepted.
    pub fn from_hex(hex: &str) -> Result<Self, MarketError> {
        let hex = hex.trim();
        let hex = hex.strip_prefix("sha256:").unwrap_or(hex);
        if hex.len() != 64 {
            return Err(MarketError::InvalidMetadata(format!(
                "digest must be 64 hex chars, got {} chars",
                hex.len()
            )));
        }
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(MarketError::InvalidMetadata(
                "digest contains non-hex characters".into(),
            ));
        }
        let mut bytes = [0u8; 32];
        for (i, slot) in bytes.iter_mut().enumerate() {
            let pair = &hex[i * 2..i * 2 + 2];
            *slot = u8::from_str_radix(pair, 16).map_err(|_| {
                MarketError::InvalidMetadata("digest contains non-hex characters".into())
            })?;
        }
        Ok(Self::new(DigestAlgorithm::Sha256, bytes))
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Access the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

/// Compute the SHA-256 fingerprint of canonical content bytes.
///
/// # Security Invariant
///
/// Accepts only `&ContentBytes`, not raw `&[u8]`, so every fingerprint in
/// the system is taken over the exact bytes that are stored.
pub fn fingerprint(content: &ContentBytes) -> ContentDigest {
    let hash = Sha256::digest(content.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest::new(DigestAlgorithm::Sha256, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_deterministic() {
        let cb = ContentBytes::from_text("ALPHA");
        let d1 = fingerprint(&cb);
        let d2 = fingerprint(&cb);
        assert_eq!(d1, d2);
        assert_eq!(d1.algorithm, DigestAlgorithm::Sha256);
    }

    #[test]
    fn test_hex_format() {
        let hex = fingerprint(&ContentBytes::new(b"data".to_vec())).to_hex();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_content_digest_display() {
        let digest = fingerprint(&ContentBytes::from_text("a"));
        let s = format!("{digest}");
        assert!(s.starts_with("sha256:"));
        assert_eq!(s.len(), 7 + 64); // "sha256:" + 64 hex chars
    }

    #[test]
    fn test_known_sha256_vectors() {
        assert_eq!(
            fingerprint(&ContentBytes::new(Vec::new())).to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            fingerprint(&ContentBytes::from_text("abc")).to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_different_inputs_different_digests() {
        let a = fingerprint(&ContentBytes::from_text("ALPHA"));
        let b = fingerprint(&ContentBytes::from_text("BETA"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_from_hex_roundtrip_and_tag() {
        let digest = fingerprint(&ContentBytes::from_text("ALPHA"));
        assert_eq!(ContentDigest::from_hex(&digest.to_hex()).unwrap(), digest);
        assert_eq!(ContentDigest::from_hex(&digest.to_string()).unwrap(), digest);
        assert_eq!(
            ContentDigest::from_hex(&digest.to_hex().to_uppercase()).unwrap(),
            digest
        );
    }

    #[test]
    fn test_from_hex_rejects_bad_input() {
        assert!(ContentDigest::from_hex("abc123").is_err());
        assert!(ContentDigest::from_hex("").is_err());
        let non_hex = format!("{}g", "0".repeat(63));
        assert!(ContentDigest::from_hex(&non_hex).is_err());
        let multibyte = format!("{}é", "0".repeat(62));
        assert!(ContentDigest::from_hex(&multibyte).is_err());
        assert!(ContentDigest::from_hex(&"+f".repeat(32)).is_err());
        assert!(ContentDigest::from_hex(&format!("{}-1", "0".repeat(62))).is_err());
    }
}
