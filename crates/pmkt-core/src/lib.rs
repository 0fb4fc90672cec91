//! # pmkt-core — Foundational Types for the Content Marketplace
//!
//! This crate is the leaf of the marketplace workspace. It defines the
//! type-system primitives the integrity and licensing engine is built on.
//! Every other crate depends on `pmkt-core`; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `ListingId`, `LicenseId`, and
//!    `Identity` are distinct types. A buyer identity cannot be passed where
//!    a listing id is expected.
//!
//! 2. **`ContentBytes` newtype.** Every fingerprint is computed from
//!    `ContentBytes`, and the same value is what gets uploaded to the blob
//!    store. Listing-time and verification-time hashing see identical bytes.
//!
//! 3. **`fingerprint()` accepts only `&ContentBytes`.** Compile-time
//!    enforcement that no code path hashes bytes that were not
//!    canonicalized first.
//!
//! 4. **UTC-only timestamps.** `Timestamp` is UTC with seconds precision,
//!    and the `Clock` trait is the only source of "now" inside the ledger so
//!    licence expiration is evaluated against an injectable clock.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `pmkt-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod content;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use content::ContentBytes;
pub use digest::{fingerprint, ContentDigest, DigestAlgorithm};
pub use error::MarketError;
pub use identity::{Identity, LicenseId, ListingId};
pub use temporal::{Clock, ManualClock, SystemClock, Timestamp};
