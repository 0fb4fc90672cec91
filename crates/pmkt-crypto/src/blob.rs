//! # Blob Store Adapter
//!
//! The raw byte store is an external collaborator. The ledger consumes it
//! only through [`BlobStore`]:
//!
//! ```text
//! begin_upload(size, content_type) ──▶ UploadTicket { write_location, retrieval_locator }
//! write(write_location, bytes)     ──▶ blob published under retrieval_locator
//! fetch(retrieval_locator)         ──▶ bytes | Unavailable
//! discard(retrieval_locator)       ──▶ best-effort removal of an orphaned blob
//! ```
//!
//! ## Atomicity
//!
//! `write` either publishes the full payload or nothing. A payload whose
//! length differs from the size announced at `begin_upload` is rejected
//! with `SizeMismatch` and never becomes fetchable.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BlobError;

/// Where the uploader writes bytes. Single-use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WriteLocation(pub String);

/// Stable handle under which a published blob is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobLocator(pub String);

impl WriteLocation {
    /// Return the location as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl BlobLocator {
    /// Return the locator as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WriteLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for BlobLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of [`BlobStore::begin_upload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTicket {
    /// Location the payload must be written to.
    pub write_location: WriteLocation,
    /// Locator the blob will be fetchable under once written.
    pub retrieval_locator: BlobLocator,
    /// Announced payload size in bytes.
    pub size: u64,
    /// Announced MIME type.
    pub content_type: String,
}

/// A raw byte store that hands out write and read locations.
pub trait BlobStore: Send + Sync {
    /// Reserve an upload slot for `size` bytes of `content_type`.
    fn begin_upload(&self, size: u64, content_type: &str) -> Result<UploadTicket, BlobError>;

    /// Write the full payload to a reserved location and publish it.
    fn write(&self, location: &WriteLocation, bytes: &[u8]) -> Result<(), BlobError>;

    /// Fetch a published blob.
    fn fetch(&self, locator: &BlobLocator) -> Result<Vec<u8>, BlobError>;

    /// Remove a published blob. Removing an absent blob is not an error.
    fn discard(&self, locator: &BlobLocator) -> Result<(), BlobError>;

    /// Release a reserved slot that will never be written. Cancelling an
    /// unknown or already published location is not an error.
    fn cancel_upload(&self, location: &WriteLocation) -> Result<(), BlobError>;
}

impl<B: BlobStore + ?Sized> BlobStore for std::sync::Arc<B> {
    fn begin_upload(&self, size: u64, content_type: &str) -> Result<UploadTicket, BlobError> {
        (**self).begin_upload(size, content_type)
    }

    fn write(&self, location: &WriteLocation, bytes: &[u8]) -> Result<(), BlobError> {
        (**self).write(location, bytes)
    }

    fn fetch(&self, locator: &BlobLocator) -> Result<Vec<u8>, BlobError> {
        (**self).fetch(locator)
    }

    fn discard(&self, locator: &BlobLocator) -> Result<(), BlobError> {
        (**self).discard(locator)
    }

    fn cancel_upload(&self, location: &WriteLocation) -> Result<(), BlobError> {
        (**self).cancel_upload(location)
    }
}

// ---------------------------------------------------------------------------
// MemoryBlobStore
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct PendingUpload {
    locator: BlobLocator,
    size: u64,
}

#[derive(Debug, Default)]
struct MemoryInner {
    pending: HashMap<WriteLocation, PendingUpload>,
    blobs: HashMap<BlobLocator, Vec<u8>>,
    failing_writes: u32,
    failing_fetches: u32,
}

/// In-process blob store.
///
/// Besides the [`BlobStore`] contract it exposes hooks that tests use to
/// simulate the outside world: out-of-band replacement of a stored blob
/// ([`tamper`](MemoryBlobStore::tamper)), loss of a blob
/// ([`lose`](MemoryBlobStore::lose)), and transient outages
/// ([`fail_next_writes`](MemoryBlobStore::fail_next_writes),
/// [`fail_next_fetches`](MemoryBlobStore::fail_next_fetches)).
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryBlobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the bytes behind a published locator without telling anyone.
    /// Returns false if the locator is unknown.
    pub fn tamper(&self, locator: &BlobLocator, bytes: impl Into<Vec<u8>>) -> bool {
        let mut inner = self.inner.lock();
        match inner.blobs.get_mut(locator) {
            Some(slot) => {
                *slot = bytes.into();
                true
            }
            None => false,
        }
    }

    /// Drop a published blob as if the backend lost it.
    pub fn lose(&self, locator: &BlobLocator) -> bool {
        self.inner.lock().blobs.remove(locator).is_some()
    }

    /// Make the next `n` writes fail with `Unavailable`.
    pub fn fail_next_writes(&self, n: u32) {
        self.inner.lock().failing_writes = n;
    }

    /// Make the next `n` fetches fail with `Unavailable`.
    pub fn fail_next_fetches(&self, n: u32) {
        self.inner.lock().failing_fetches = n;
    }

    /// Whether a blob is published under `locator`.
    pub fn contains(&self, locator: &BlobLocator) -> bool {
        self.inner.lock().blobs.contains_key(locator)
    }

    /// Number of published blobs.
    pub fn len(&self) -> usize {
        self.inner.lock().blobs.len()
    }

    /// Whether no blob is published.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of reserved slots not yet written or cancelled.
    pub fn pending_uploads(&self) -> usize {
        self.inner.lock().pending.len()
    }
}

impl BlobStore for MemoryBlobStore {
    fn begin_upload(&self, size: u64, content_type: &str) -> Result<UploadTicket, BlobError> {
        let id = Uuid::new_v4();
        let write_location = WriteLocation(format!("mem-upload:{id}"));
        let retrieval_locator = BlobLocator(format!("mem:{id}"));
        self.inner.lock().pending.insert(
            write_location.clone(),
            PendingUpload {
                locator: retrieval_locator.clone(),
                size,
            },
        );
        Ok(UploadTicket {
            write_location,
            retrieval_locator,
            size,
            content_type: content_type.to_string(),
        })
    }

    fn write(&self, location: &WriteLocation, bytes: &[u8]) -> Result<(), BlobError> {
        let mut inner = self.inner.lock();
        if inner.failing_writes > 0 {
            inner.failing_writes -= 1;
            return Err(BlobError::Unavailable("injected write failure".into()));
        }
        let expected = inner
            .pending
            .get(location)
            .map(|p| p.size)
            .ok_or_else(|| BlobError::UnknownUpload(location.to_string()))?;
        let actual = bytes.len() as u64;
        if expected != actual {
            return Err(BlobError::SizeMismatch { expected, actual });
        }
        if let Some(pending) = inner.pending.remove(location) {
            tracing::debug!(locator = %pending.locator, size = actual, "blob published");
            inner.blobs.insert(pending.locator, bytes.to_vec());
        }
        Ok(())
    }

    fn fetch(&self, locator: &BlobLocator) -> Result<Vec<u8>, BlobError> {
        let mut inner = self.inner.lock();
        if inner.failing_fetches > 0 {
            inner.failing_fetches -= 1;
            return Err(BlobError::Unavailable("injected fetch failure".into()));
        }
        inner
            .blobs
            .get(locator)
            .cloned()
            .ok_or_else(|| BlobError::Unavailable(format!("no blob at {locator}")))
    }

    fn discard(&self, locator: &BlobLocator) -> Result<(), BlobError> {
        self.inner.lock().blobs.remove(locator);
        Ok(())
    }

    fn cancel_upload(&self, location: &WriteLocation) -> Result<(), BlobError> {
        self.inner.lock().pending.remove(location);
        Ok(())
    }
}
