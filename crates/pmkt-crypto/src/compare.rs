//! # Fingerprint Comparison
//!
//! Digest equality for verification paths. Comparing the raw 32-byte
//! digests with `subtle` keeps the comparison time independent of where
//! the first differing byte is.

use pmkt_core::ContentDigest;
use subtle::ConstantTimeEq;

/// Constant-time equality of two content digests (algorithm tags included).
pub fn digests_match(a: &ContentDigest, b: &ContentDigest) -> bool {
    a.algorithm == b.algorithm && bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}
