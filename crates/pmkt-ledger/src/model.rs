//! # Ledger Records
//!
//! The records the ledger stores: listings, the on-chain content record
//! bound to each active listing, licenses, and the redacted summary view
//! handed to callers who may not retrieve.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use pmkt_core::{ContentDigest, Identity, LicenseId, ListingId, MarketError, Timestamp};
use pmkt_crypto::{BlobLocator, WriteLocation};

/// Longest accepted listing title, in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// Longest accepted description, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 10_000;

/// Maximum number of thumbnail references per listing.
pub const MAX_THUMBNAILS: usize = 8;

/// Ratings are whole stars from 1 to this value.
pub const MAX_RATING: u8 = 5;

// ─── Item Kind ───────────────────────────────────────────────────────

/// What sort of digital item a listing sells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemKind {
    /// A text prompt.
    TextPrompt,
    /// A dataset.
    Dataset,
    /// Output generated by a model.
    GeneratedOutput,
}

impl ItemKind {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextPrompt => "text-prompt",
            Self::Dataset => "dataset",
            Self::GeneratedOutput => "generated-output",
        }
    }

    /// MIME type announced to the blob store for this kind.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::TextPrompt => "text/plain",
            Self::Dataset | Self::GeneratedOutput => "application/octet-stream",
        }
    }
}

impl std::str::FromStr for ItemKind {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text-prompt" | "prompt" => Ok(Self::TextPrompt),
            "dataset" => Ok(Self::Dataset),
            "generated-output" | "output" => Ok(Self::GeneratedOutput),
            other => Err(MarketError::InvalidMetadata(format!(
                "unknown item kind {other:?}"
            ))),
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Price ───────────────────────────────────────────────────────────

/// A strictly positive amount in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Price(u64);

impl Price {
    /// Validate a caller-supplied price. Zero and negative amounts are
    /// rejected with `InvalidPrice`.
    pub fn new(amount: i64) -> Result<Self, MarketError> {
        if amount <= 0 {
            return Err(MarketError::InvalidPrice(amount));
        }
        Ok(Self(amount.unsigned_abs()))
    }

    /// Amount in minor units.
    pub fn amount(&self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for Price {
    type Error = MarketError;

    fn try_from(amount: u64) -> Result<Self, Self::Error> {
        if amount == 0 {
            return Err(MarketError::InvalidPrice(0));
        }
        Ok(Self(amount))
    }
}

impl From<Price> for u64 {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── Metadata ────────────────────────────────────────────────────────

/// Descriptive fields a seller controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingMetadata {
    /// Short title shown in listings.
    pub title: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Kind of item.
    pub kind: ItemKind,
    /// Seller-chosen category label.
    #[serde(default)]
    pub category: String,
    /// License terms recorded alongside the fingerprint.
    #[serde(default)]
    pub license_terms: String,
    /// Royalty percentage recorded on the content record (0-100).
    #[serde(default)]
    pub royalty_percent: u8,
    /// Public thumbnail references. Never blob locators.
    #[serde(default)]
    pub thumbnails: Vec<String>,
}

impl ListingMetadata {
    /// Metadata with a title and kind; every other field empty.
    pub fn new(title: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            kind,
            category: String::new(),
            license_terms: String::new(),
            royalty_percent: 0,
            thumbnails: Vec::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Set license terms and royalty.
    pub fn with_terms(mut self, license_terms: impl Into<String>, royalty_percent: u8) -> Self {
        self.license_terms = license_terms.into();
        self.royalty_percent = royalty_percent;
        self
    }

    /// Check field bounds.
    pub fn validate(&self) -> Result<(), MarketError> {
        if self.title.trim().is_empty() {
            return Err(MarketError::InvalidMetadata("title must not be empty".into()));
        }
        if self.title.chars().count() > MAX_TITLE_LEN {
            return Err(MarketError::InvalidMetadata(format!(
                "title exceeds {MAX_TITLE_LEN} characters"
            )));
        }
        if self.description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(MarketError::InvalidMetadata(format!(
                "description exceeds {MAX_DESCRIPTION_LEN} characters"
            )));
        }
        if self.royalty_percent > 100 {
            return Err(MarketError::InvalidMetadata(format!(
                "royalty {}% exceeds 100%",
                self.royalty_percent
            )));
        }
        if self.thumbnails.len() > MAX_THUMBNAILS {
            return Err(MarketError::InvalidMetadata(format!(
                "at most {MAX_THUMBNAILS} thumbnails are allowed"
            )));
        }
        Ok(())
    }
}

// ─── Listing ─────────────────────────────────────────────────────────

/// Whether a listing is live or has been taken down by its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    /// Purchasable and bound to a content record.
    Active,
    /// Soft-deleted. Kept so existing licenses can still be resolved.
    Removed,
}

/// Where a listing's bytes live in the blob store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRef {
    /// Location the bytes were written to.
    pub write_location: WriteLocation,
    /// Locator the bytes are fetched from.
    pub retrieval_locator: BlobLocator,
    /// Payload size in bytes.
    pub size: u64,
    /// MIME type announced at upload.
    pub content_type: String,
}

/// A listing as stored by the ledger.
///
/// The `owner` is fixed at creation. `blob` is secret: it must only reach
/// callers who pass the access gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    /// Ledger-assigned id.
    pub id: ListingId,
    /// Seller identity.
    pub owner: Identity,
    /// Descriptive fields.
    pub metadata: ListingMetadata,
    /// Fingerprint of the stored bytes.
    pub fingerprint: ContentDigest,
    /// Price in minor units.
    pub price: Price,
    /// Blob store addresses for the bytes.
    pub blob: BlobRef,
    /// Live or removed.
    pub status: ListingStatus,
    /// When the listing was created.
    pub created_at: Timestamp,
    /// When the listing was last edited.
    pub updated_at: Timestamp,
    /// When the listing was removed, if it was.
    #[serde(default)]
    pub removed_at: Option<Timestamp>,
    /// Number of recorded views.
    #[serde(default)]
    pub views: u64,
    /// Identities that favorited the listing.
    #[serde(default)]
    pub favorites: BTreeSet<Identity>,
    /// Sum of submitted ratings.
    #[serde(default)]
    pub rating_sum: u64,
    /// Number of submitted ratings.
    #[serde(default)]
    pub rating_count: u64,
}

impl Listing {
    /// Whether the listing is live.
    pub fn is_active(&self) -> bool {
        self.status == ListingStatus::Active
    }

    /// Number of distinct identities that favorited the listing.
    pub fn favorite_count(&self) -> usize {
        self.favorites.len()
    }

    /// Mean rating, or `None` when nobody has rated.
    pub fn average_rating(&self) -> Option<f64> {
        if self.rating_count == 0 {
            return None;
        }
        Some(self.rating_sum as f64 / self.rating_count as f64)
    }
}

// ─── Content Record ──────────────────────────────────────────────────

/// The provenance entry bound to an active listing. Exactly one exists per
/// active listing; removing the listing removes the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Listing the record belongs to.
    pub listing_id: ListingId,
    /// Registered fingerprint.
    pub fingerprint: ContentDigest,
    /// Owner at registration time.
    pub owner: Identity,
    /// License terms at registration time.
    pub license_terms: String,
    /// Royalty percentage at registration time.
    pub royalty_percent: u8,
    /// Whether the fingerprint was computed by the ledger from uploaded bytes.
    pub verified: bool,
    /// When the fingerprint was registered.
    pub registered_at: Timestamp,
}

impl ContentRecord {
    pub(crate) fn for_listing(listing: &Listing, now: Timestamp) -> Self {
        Self {
            listing_id: listing.id,
            fingerprint: listing.fingerprint.clone(),
            owner: listing.owner.clone(),
            license_terms: listing.metadata.license_terms.clone(),
            royalty_percent: listing.metadata.royalty_percent,
            verified: true,
            registered_at: now,
        }
    }
}

// ─── License ─────────────────────────────────────────────────────────

/// Grant of retrieval rights to a buyer. Licenses are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    /// License id.
    pub id: LicenseId,
    /// Listing the license covers.
    pub listing_id: ListingId,
    /// Identity that bought the license.
    pub buyer: Identity,
    /// Amount debited from the buyer.
    pub price_paid: u64,
    /// Portion credited to the seller.
    pub seller_credit: u64,
    /// Portion credited to the platform treasury.
    pub platform_fee: u64,
    /// When the license was granted.
    pub created_at: Timestamp,
    /// End of validity; `None` never expires.
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
}

impl License {
    /// Whether the license grants access at `now`.
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        match self.expires_at {
            Some(expiry) => now < expiry,
            None => true,
        }
    }
}

// ─── Fee Split ───────────────────────────────────────────────────────

/// How a purchase price divides between seller and treasury.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    /// Seller's share.
    pub seller: u64,
    /// Platform's share.
    pub platform: u64,
}

impl FeeSplit {
    /// Split `price` with a platform fee of `fee_bps` basis points, rounded
    /// down. The two shares always sum to `price`.
    pub fn compute(price: u64, fee_bps: u16) -> Self {
        let bps = u128::from(fee_bps.min(10_000));
        let platform = (u128::from(price) * bps / 10_000) as u64;
        Self {
            seller: price - platform,
            platform,
        }
    }
}

// ─── Summary ─────────────────────────────────────────────────────────

/// Public view of a listing. Carries no blob address and no fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingSummary {
    pub id: ListingId,
    pub owner: Identity,
    pub title: String,
    pub description: String,
    pub kind: ItemKind,
    pub category: String,
    pub thumbnails: Vec<String>,
    pub price: u64,
    pub status: ListingStatus,
    pub created_at: Timestamp,
    pub views: u64,
    pub favorite_count: usize,
    pub average_rating: Option<f64>,
}

impl From<&Listing> for ListingSummary {
    fn from(listing: &Listing) -> Self {
        Self {
            id: listing.id,
            owner: listing.owner.clone(),
            title: listing.metadata.title.clone(),
            description: listing.metadata.description.clone(),
            kind: listing.metadata.kind,
            category: listing.metadata.category.clone(),
            thumbnails: listing.metadata.thumbnails.clone(),
            price: listing.price.amount(),
            status: listing.status,
            created_at: listing.created_at,
            views: listing.views,
            favorite_count: listing.favorite_count(),
            average_rating: listing.average_rating(),
        }
    }
}
