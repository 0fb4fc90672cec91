//! # Error Types — Marketplace Error Taxonomy
//!
//! Defines the error type returned by every ledger operation. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Every mutating operation either fully succeeds or reports exactly one
//!   of these variants with no partial state change.
//! - `Forbidden` carries no payload. It is returned both for unauthorized
//!   retrieval and for retrieval of a listing that does not exist, so its
//!   rendering must never reveal a locator, a fingerprint, or whether the
//!   listing exists.
//! - Verification mismatches are not errors; they are reported as data.

use thiserror::Error;

use crate::identity::ListingId;

/// Top-level error type for the marketplace engine.
#[derive(Error, Debug)]
pub enum MarketError {
    /// Content with this fingerprint is already bound to an active listing.
    #[error("duplicate content: this content is already registered to an active listing")]
    DuplicateContent,

    /// Price must be a positive minor-unit amount.
    #[error("invalid price {0}: price must be greater than zero")]
    InvalidPrice(i64),

    /// Listing metadata or another caller-supplied value failed validation.
    #[error("invalid input: {0}")]
    InvalidMetadata(String),

    /// An identity string failed validation.
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// The caller does not own the listing.
    #[error("caller is not the owner of {0}")]
    NotOwner(ListingId),

    /// No listing with this id has ever existed.
    #[error("{0} not found")]
    NotFound(ListingId),

    /// A seller attempted to purchase their own listing.
    #[error("cannot purchase your own listing")]
    CannotBuyOwnItem,

    /// The buyer already holds an active license for the listing.
    #[error("already licensed for {0}")]
    AlreadyLicensed(ListingId),

    /// The buyer's balance does not cover the listing price.
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        /// Listing price in minor units.
        required: u64,
        /// Buyer's balance in minor units.
        available: u64,
    },

    /// The listing has been removed by its owner.
    #[error("{0} has been removed")]
    ListingRemoved(ListingId),

    /// Retrieval denied. Deliberately indistinguishable from "not found".
    #[error("forbidden")]
    Forbidden,

    /// The blob store could not serve or accept the content. Retryable.
    #[error("blob unavailable: {0}")]
    BlobUnavailable(String),

    /// The one-time top-up was already claimed by this identity.
    #[error("top-up already claimed")]
    TopUpAlreadyClaimed,

    /// A balance credit would overflow.
    #[error("balance overflow")]
    BalanceOverflow,

    /// Ledger state is internally inconsistent (e.g. a corrupt snapshot).
    #[error("integrity error: {0}")]
    Integrity(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MarketError {
    /// Whether the caller may retry the same request unchanged.
    ///
    /// Only external blob failures are transient; every other variant is
    /// either terminal or needs the request itself to change.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BlobUnavailable(_))
    }

    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateContent => "DuplicateContent",
            Self::InvalidPrice(_) => "InvalidPrice",
            Self::InvalidMetadata(_) => "InvalidMetadata",
            Self::InvalidIdentity(_) => "InvalidIdentity",
            Self::NotOwner(_) => "NotOwner",
            Self::NotFound(_) => "NotFound",
            Self::CannotBuyOwnItem => "CannotBuyOwnItem",
            Self::AlreadyLicensed(_) => "AlreadyLicensed",
            Self::InsufficientFunds { .. } => "InsufficientFunds",
            Self::ListingRemoved(_) => "ListingRemoved",
            Self::Forbidden => "Forbidden",
            Self::BlobUnavailable(_) => "BlobUnavailable",
            Self::TopUpAlreadyClaimed => "TopUpAlreadyClaimed",
            Self::BalanceOverflow => "BalanceOverflow",
            Self::Integrity(_) => "Integrity",
            Self::Serialization(_) => "Serialization",
            Self::Io(_) => "Io",
        }
    }
}
