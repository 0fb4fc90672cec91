//! # Marketplace
//!
//! The entry point embedding applications call. It owns the ledger state
//! behind a single `parking_lot::RwLock`, the blob store, a clock, and the
//! configuration.
//!
//! ## Locking
//!
//! Reads take the read lock. Each mutation takes the write lock exactly
//! once and runs one [`LedgerState`] transition, so concurrent callers
//! observe either all of an operation or none of it. Blob store I/O never
//! runs under the lock:
//!
//! ```text
//! submit:   read lock (duplicate pre-check) ─▶ upload ─▶ write lock (claim + commit)
//! retrieve: read lock (access gate)         ─▶ fetch
//! verify:   read lock (capture record)      ─▶ fetch ─▶ reconcile
//! ```
//!
//! The pre-check only saves a wasted upload; the claim under the write
//! lock is what decides a race. A submission that loses it discards the
//! blob it uploaded.

use std::sync::Arc;

use parking_lot::RwLock;

use pmkt_core::{
    fingerprint, Clock, ContentBytes, ContentDigest, Identity, LicenseId, ListingId, MarketError,
    SystemClock, Timestamp,
};
use pmkt_crypto::{BlobLocator, BlobStore};

use crate::access::AccessGate;
use crate::config::MarketConfig;
use crate::listing::{ListingUpdate, NewListing, Readdress};
use crate::model::{BlobRef, FeeSplit, License, Listing, ListingMetadata, ListingSummary, Price};
use crate::retry::with_retries;
use crate::snapshot::LedgerSnapshot;
use crate::state::LedgerState;
use crate::verify::{VerificationResult, VerificationService};

/// Thread-safe marketplace engine over a blob store `B`.
pub struct Marketplace<B: BlobStore> {
    state: RwLock<LedgerState>,
    blobs: B,
    clock: Arc<dyn Clock>,
    config: MarketConfig,
}

impl<B: BlobStore> std::fmt::Debug for Marketplace<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Marketplace")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<B: BlobStore> Marketplace<B> {
    /// An empty marketplace on the system clock.
    pub fn new(blobs: B, config: MarketConfig) -> Result<Self, MarketError> {
        Self::with_clock(blobs, config, Arc::new(SystemClock))
    }

    /// An empty marketplace on a caller-supplied clock.
    pub fn with_clock(
        blobs: B,
        config: MarketConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, MarketError> {
        Self::assemble(blobs, config, clock, LedgerState::new())
    }

    /// A marketplace restored from a snapshot.
    pub fn from_snapshot(
        blobs: B,
        config: MarketConfig,
        clock: Arc<dyn Clock>,
        snapshot: LedgerSnapshot,
    ) -> Result<Self, MarketError> {
        Self::assemble(blobs, config, clock, LedgerState::from_snapshot(snapshot)?)
    }

    fn assemble(
        blobs: B,
        config: MarketConfig,
        clock: Arc<dyn Clock>,
        state: LedgerState,
    ) -> Result<Self, MarketError> {
        config.validate()?;
        Ok(Self {
            state: RwLock::new(state),
            blobs,
            clock,
            config,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    /// The underlying blob store.
    pub fn blobs(&self) -> &B {
        &self.blobs
    }

    /// Current time according to the marketplace clock.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    // ── Listings ────────────────────────────────────────────────────

    /// Fingerprint `content`, store it, and list it for sale.
    pub fn submit_listing(
        &self,
        owner: &Identity,
        metadata: ListingMetadata,
        price: i64,
        content: ContentBytes,
    ) -> Result<ListingId, MarketError> {
        Price::new(price)?;
        metadata.validate()?;
        ensure_content(&content)?;
        let fingerprint = fingerprint(&content);

        if self.state.read().is_duplicate(&fingerprint) {
            tracing::debug!(owner = %owner, "listing rejected: duplicate content");
            return Err(MarketError::DuplicateContent);
        }

        let blob = self.upload(&content, metadata.kind.content_type())?;
        let uploaded = blob.retrieval_locator.clone();
        let new = NewListing {
            owner: owner.clone(),
            metadata,
            price,
            fingerprint,
            blob,
        };
        let result = self.state.write().create_listing(new, self.now());
        match result {
            Ok(id) => {
                tracing::info!(listing_id = %id, owner = %owner, price, "listing created");
                Ok(id)
            }
            Err(err) => {
                self.discard_orphan(&uploaded);
                tracing::debug!(owner = %owner, code = err.code(), "listing rejected");
                Err(err)
            }
        }
    }

    /// Edit a listing the caller owns. Supplying `content` re-fingerprints
    /// and re-uploads; content identical to the current bytes only updates
    /// the other fields.
    pub fn edit_listing(
        &self,
        id: ListingId,
        caller: &Identity,
        metadata: Option<ListingMetadata>,
        price: Option<i64>,
        content: Option<ContentBytes>,
    ) -> Result<(), MarketError> {
        if let Some(price) = price {
            Price::new(price)?;
        }
        if let Some(metadata) = &metadata {
            metadata.validate()?;
        }

        let readdress = match content {
            None => None,
            Some(content) => {
                ensure_content(&content)?;
                let fingerprint = fingerprint(&content);
                let kind = {
                    let state = self.state.read();
                    let listing = state.owned_active_listing(id, caller)?;
                    if listing.fingerprint == fingerprint {
                        None
                    } else if state.is_duplicate(&fingerprint) {
                        tracing::debug!(listing_id = %id, "edit rejected: duplicate content");
                        return Err(MarketError::DuplicateContent);
                    } else {
                        Some(metadata.as_ref().map_or(listing.metadata.kind, |m| m.kind))
                    }
                };
                match kind {
                    None => None,
                    Some(kind) => Some(Readdress {
                        fingerprint,
                        blob: self.upload(&content, kind.content_type())?,
                    }),
                }
            }
        };

        let uploaded = readdress
            .as_ref()
            .map(|r| r.blob.retrieval_locator.clone());
        let update = ListingUpdate {
            metadata,
            price,
            content: readdress,
        };
        let result = self.state.write().update_listing(id, caller, update, self.now());
        match result {
            Ok(readdressed) => {
                if !readdressed {
                    if let Some(locator) = &uploaded {
                        self.discard_orphan(locator);
                    }
                }
                tracing::info!(listing_id = %id, owner = %caller, readdressed, "listing updated");
                Ok(())
            }
            Err(err) => {
                if let Some(locator) = &uploaded {
                    self.discard_orphan(locator);
                }
                tracing::debug!(listing_id = %id, code = err.code(), "edit rejected");
                Err(err)
            }
        }
    }

    /// Soft-delete a listing the caller owns and free its fingerprint.
    pub fn remove_listing(&self, id: ListingId, caller: &Identity) -> Result<(), MarketError> {
        let result = self.state.write().delete_listing(id, caller, self.now());
        match &result {
            Ok(()) => tracing::info!(listing_id = %id, owner = %caller, "listing removed"),
            Err(err) => tracing::debug!(listing_id = %id, code = err.code(), "removal rejected"),
        }
        result
    }

    /// Full listing record, including its blob address. Owner tooling only;
    /// public callers use [`listing_summary`](Self::listing_summary).
    pub fn get_listing(&self, id: ListingId) -> Result<Listing, MarketError> {
        self.state.read().listing(id).cloned()
    }

    /// Public view of a listing.
    pub fn listing_summary(&self, id: ListingId) -> Result<ListingSummary, MarketError> {
        self.state.read().listing(id).map(ListingSummary::from)
    }

    /// Whether `fingerprint` is already held by an active listing.
    /// Advisory: a later submission can still race.
    pub fn check_duplicate(&self, fingerprint: &ContentDigest) -> bool {
        self.state.read().is_duplicate(fingerprint)
    }

    /// Count a view. Returns the new total.
    pub fn record_view(&self, id: ListingId) -> Result<u64, MarketError> {
        self.state.write().record_view(id)
    }

    /// Record a 1-5 star rating. Returns the new rating count.
    pub fn record_rating(&self, id: ListingId, stars: u8) -> Result<u64, MarketError> {
        let count = self.state.write().record_rating(id, stars)?;
        tracing::debug!(listing_id = %id, stars, count, "rating recorded");
        Ok(count)
    }

    /// Toggle a favorite. Returns whether the listing is now a favorite.
    pub fn toggle_favorite(&self, identity: &Identity, id: ListingId) -> Result<bool, MarketError> {
        self.state.write().toggle_favorite(identity, id)
    }

    // ── Licenses ────────────────────────────────────────────────────

    /// Buy a license on an active listing.
    pub fn purchase_license(
        &self,
        buyer: &Identity,
        id: ListingId,
    ) -> Result<LicenseId, MarketError> {
        let result = self
            .state
            .write()
            .purchase(buyer, id, self.now(), &self.config);
        match result {
            Ok(license) => {
                tracing::info!(
                    listing_id = %id,
                    buyer = %buyer,
                    license_id = %license.id,
                    price = license.price_paid,
                    platform_fee = license.platform_fee,
                    "license purchased"
                );
                Ok(license.id)
            }
            Err(err) => {
                tracing::debug!(listing_id = %id, buyer = %buyer, code = err.code(), "purchase rejected");
                Err(err)
            }
        }
    }

    /// Look up a license by id.
    pub fn license(&self, id: LicenseId) -> Option<License> {
        self.state.read().license(id).cloned()
    }

    /// Every license `identity` bought, oldest first.
    pub fn list_licenses_for(&self, identity: &Identity) -> Vec<License> {
        self.state.read().licenses_for(identity)
    }

    /// Every license sold on a listing. Owner only.
    pub fn licenses_for_listing(
        &self,
        caller: &Identity,
        id: ListingId,
    ) -> Result<Vec<License>, MarketError> {
        self.state.read().licenses_for_listing(caller, id)
    }

    /// Whether `identity` may retrieve the listing now.
    pub fn can_retrieve(&self, identity: &Identity, id: ListingId) -> bool {
        let state = self.state.read();
        AccessGate::new(&state).can_retrieve(identity, id, self.now())
    }

    /// Fetch the listing's bytes for its owner or an active licensee.
    pub fn retrieve_content(&self, identity: &Identity, id: ListingId) -> Result<Vec<u8>, MarketError> {
        let now = self.now();
        let locator = {
            let state = self.state.read();
            match AccessGate::new(&state).authorize(identity, id, now) {
                Ok(locator) => locator.clone(),
                Err(err) => {
                    tracing::debug!(listing_id = %id, caller = %identity, code = err.code(), "retrieval denied");
                    return Err(err);
                }
            }
        };
        let bytes = with_retries(self.config.blob_retry_attempts, "fetch", || {
            self.blobs.fetch(&locator)
        })?;
        tracing::info!(listing_id = %id, caller = %identity, size = bytes.len(), "content retrieved");
        Ok(bytes)
    }

    /// Re-fingerprint the stored bytes and compare with the content record.
    pub fn verify_listing(&self, id: ListingId) -> VerificationResult {
        let target = self.state.read().verification_target(id);
        let result = VerificationService::new(&self.blobs, self.config.blob_retry_attempts)
            .verify(target, self.now());
        tracing::info!(listing_id = %id, matched = result.matched, "listing verified");
        result
    }

    // ── Balances ────────────────────────────────────────────────────

    /// Credit `amount` to `identity`. Returns the new balance.
    pub fn deposit(&self, identity: &Identity, amount: u64) -> Result<u64, MarketError> {
        let balance = self.state.write().deposit(identity, amount)?;
        tracing::info!(identity = %identity, amount, balance, "deposit credited");
        Ok(balance)
    }

    /// Credit the one-time top-up. Returns the new balance.
    pub fn claim_top_up(&self, identity: &Identity) -> Result<u64, MarketError> {
        let amount = self.config.top_up_amount;
        let balance = self.state.write().claim_top_up(identity, amount)?;
        tracing::info!(identity = %identity, amount, balance, "top-up claimed");
        Ok(balance)
    }

    /// Whether `identity` already claimed its top-up.
    pub fn has_claimed_top_up(&self, identity: &Identity) -> bool {
        self.state.read().balances().has_claimed_top_up(identity)
    }

    /// Current balance.
    pub fn balance_of(&self, identity: &Identity) -> u64 {
        self.state.read().balance_of(identity)
    }

    /// Seller and platform shares of `price` under the current fee.
    pub fn fee_split(&self, price: u64) -> FeeSplit {
        self.config.fee_split(price)
    }

    /// Sum of every balance. Unchanged by purchases.
    pub fn total_balance(&self) -> u128 {
        self.state.read().balances().total()
    }

    // ── Persistence ─────────────────────────────────────────────────

    /// Consistent image of the whole ledger.
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.state.read().to_snapshot()
    }

    /// Replace the ledger with a snapshot. On error the ledger is unchanged.
    pub fn restore(&self, snapshot: LedgerSnapshot) -> Result<(), MarketError> {
        let restored = LedgerState::from_snapshot(snapshot)?;
        *self.state.write() = restored;
        tracing::info!("ledger restored from snapshot");
        Ok(())
    }

    // ── Blob plumbing ───────────────────────────────────────────────

    fn upload(&self, content: &ContentBytes, content_type: &str) -> Result<BlobRef, MarketError> {
        let attempts = self.config.blob_retry_attempts;
        let size = content.len() as u64;
        let ticket = with_retries(attempts, "begin upload", || {
            self.blobs.begin_upload(size, content_type)
        })?;
        let written = with_retries(attempts, "write", || {
            self.blobs.write(&ticket.write_location, content.as_bytes())
        });
        if let Err(err) = written {
            if let Err(cancel) = self.blobs.cancel_upload(&ticket.write_location) {
                tracing::warn!(error = %cancel, "failed to cancel upload slot");
            }
            return Err(err.into());
        }
        Ok(BlobRef {
            write_location: ticket.write_location,
            retrieval_locator: ticket.retrieval_locator,
            size: ticket.size,
            content_type: ticket.content_type,
        })
    }

    fn discard_orphan(&self, locator: &BlobLocator) {
        if let Err(err) = self.blobs.discard(locator) {
            tracing::warn!(error = %err, "failed to discard orphaned blob");
        }
    }
}

fn ensure_content(content: &ContentBytes) -> Result<(), MarketError> {
    if content.is_empty() {
        return Err(MarketError::InvalidMetadata("content must not be empty".into()));
    }
    Ok(())
}
