//! # pmkt-ledger — Marketplace Ledger
//!
//! Holds the authoritative marketplace state: listings and their content
//! records, the duplicate-content index, licenses, and balances.
//!
//! ## Layout
//!
//! - [`LedgerState`] is plain data with `&mut self` transitions. Each
//!   transition checks every precondition before it writes, so a rejected
//!   operation changes nothing.
//! - [`Marketplace`] wraps one `LedgerState` in a `parking_lot::RwLock`,
//!   talks to the blob store outside the lock, and logs committed
//!   mutations with `tracing`.
//! - [`AccessGate`] and [`VerificationService`] are read-side components
//!   the marketplace composes.
//!
//! ## Invariants
//!
//! - Every active listing has exactly one content record, and no two
//!   active listings share a fingerprint.
//! - A purchase conserves the sum of all balances.
//! - Blob locators reach only the listing owner and active licensees.

pub mod access;
pub mod balances;
pub mod config;
pub mod dedup;
pub mod license;
pub mod listing;
pub mod market;
pub mod model;
mod retry;
pub mod snapshot;
pub mod state;
pub mod verify;

// ─── Component re-exports ───────────────────────────────────────────

pub use access::{Access, AccessGate};
pub use balances::Balances;
pub use config::MarketConfig;
pub use dedup::DuplicateIndex;
pub use market::Marketplace;
pub use state::LedgerState;
pub use verify::{VerificationResult, VerificationService, VerificationTarget};

// ─── Record re-exports ──────────────────────────────────────────────

pub use listing::{ListingUpdate, NewListing, Readdress};
pub use model::{
    BlobRef, ContentRecord, FeeSplit, ItemKind, License, Listing, ListingMetadata,
    ListingStatus, ListingSummary, Price,
};
pub use snapshot::{LedgerSnapshot, SNAPSHOT_VERSION};
