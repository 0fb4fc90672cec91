//! # Blob Store Error Types
//!
//! Structured errors for blob store adapters. Every variant maps onto
//! `MarketError::BlobUnavailable` at the ledger boundary; the distinction
//! is kept here for diagnostics and retry decisions.

use pmkt_core::MarketError;
use thiserror::Error;

/// Errors from blob store operations.
#[derive(Error, Debug)]
pub enum BlobError {
    /// The blob (or the store) is currently unavailable. Transient.
    #[error("blob unavailable: {0}")]
    Unavailable(String),

    /// The write location was never issued or was already consumed.
    #[error("unknown upload: {0}")]
    UnknownUpload(String),

    /// The written payload does not match the size announced at `begin_upload`.
    #[error("size mismatch: announced {expected} bytes, received {actual}")]
    SizeMismatch {
        /// Size announced at `begin_upload`.
        expected: u64,
        /// Size actually written.
        actual: u64,
    },

    /// The locator was not issued by this store.
    #[error("invalid locator: {0}")]
    InvalidLocator(String),

    /// I/O error (filesystem adapter).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BlobError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Io(_))
    }
}

impl From<BlobError> for MarketError {
    fn from(err: BlobError) -> Self {
        MarketError::BlobUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_mismatch_display() {
        let err = BlobError::SizeMismatch {
            expected: 10,
            actual: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("10"));
        assert!(msg.contains('4'));
    }

    #[test]
    fn transient_classification() {
        assert!(BlobError::Unavailable("down".into()).is_transient());
        assert!(!BlobError::InvalidLocator("x".into()).is_transient());
        assert!(!BlobError::SizeMismatch {
            expected: 1,
            actual: 2
        }
        .is_transient());
    }

    #[test]
    fn converts_to_blob_unavailable() {
        let err: MarketError = BlobError::Unavailable("gone".into()).into();
        assert!(matches!(err, MarketError::BlobUnavailable(ref m) if m.contains("gone")));
        assert!(err.is_retryable());
    }
}
