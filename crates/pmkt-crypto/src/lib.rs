//! # pmkt-crypto — Integrity and Blob Plumbing
//!
//! Provides the building blocks that sit between raw content and the
//! ledger:
//!
//! - **Fingerprint comparison** in constant time, so verification does not
//!   leak how many leading bytes of a digest matched.
//! - **Blob store adapters** behind the [`BlobStore`] trait. The ledger only
//!   ever talks to the trait: `begin_upload` hands out a write location and
//!   a stable retrieval locator, `write` publishes the bytes atomically, and
//!   `fetch` returns them (or `Unavailable`).
//!
//! ## Adapters
//!
//! - [`MemoryBlobStore`] for embedding and tests, with hooks to tamper with
//!   stored blobs and inject transient failures.
//! - [`FsBlobStore`] for a local directory, publishing each blob with a
//!   write-then-rename so a reader never sees a half-written file.
//!
//! ## Crate Policy
//!
//! - Depends only on `pmkt-core` internally.
//! - Locators are opaque to callers and validated by the adapter that
//!   issued them.

pub mod blob;
pub mod compare;
pub mod error;
pub mod fs;

pub use blob::{BlobLocator, BlobStore, MemoryBlobStore, UploadTicket, WriteLocation};
pub use compare::digests_match;
pub use error::BlobError;
pub use fs::FsBlobStore;
