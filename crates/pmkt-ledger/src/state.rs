//! # Ledger State
//!
//! The tables behind the marketplace: listings, content records, the
//! duplicate index, licenses, and balances. Every transition is a
//! `&mut self` method that validates all of its preconditions before it
//! touches a table, so a rejected call leaves the state exactly as it was.
//!
//! Transitions live next to their domain:
//! - listing lifecycle in [`crate::listing`]
//! - purchases and license queries in [`crate::license`]
//! - snapshot conversion in [`crate::snapshot`]
//!
//! [`crate::Marketplace`] wraps one `LedgerState` in a lock; the state
//! itself has no interior mutability.

use std::collections::{BTreeMap, HashMap};

use pmkt_core::{ContentDigest, Identity, ListingId, MarketError, Timestamp};

use crate::balances::Balances;
use crate::dedup::DuplicateIndex;
use crate::model::{ContentRecord, License, Listing};

/// First id handed out by a fresh ledger.
pub const FIRST_LISTING_ID: ListingId = ListingId(1);

/// All ledger tables.
#[derive(Debug, Clone)]
pub struct LedgerState {
    pub(crate) next_listing_id: ListingId,
    pub(crate) listings: BTreeMap<ListingId, Listing>,
    pub(crate) records: BTreeMap<ListingId, ContentRecord>,
    pub(crate) index: DuplicateIndex,
    /// Append-only, in grant order.
    pub(crate) licenses: Vec<License>,
    /// Position in `licenses` of the newest license per (buyer, listing).
    pub(crate) latest_license: HashMap<(Identity, ListingId), usize>,
    pub(crate) balances: Balances,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self {
            next_listing_id: FIRST_LISTING_ID,
            listings: BTreeMap::new(),
            records: BTreeMap::new(),
            index: DuplicateIndex::new(),
            licenses: Vec::new(),
            latest_license: HashMap::new(),
            balances: Balances::new(),
        }
    }
}

impl LedgerState {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Reads ───────────────────────────────────────────────────────

    /// Look up a listing, active or removed.
    pub fn listing(&self, id: ListingId) -> Result<&Listing, MarketError> {
        self.listings.get(&id).ok_or(MarketError::NotFound(id))
    }

    /// All listings in id order.
    pub fn listings(&self) -> impl Iterator<Item = &Listing> {
        self.listings.values()
    }

    /// The content record of an active listing.
    pub fn content_record(&self, id: ListingId) -> Option<&ContentRecord> {
        self.records.get(&id)
    }

    /// Whether an active listing already holds `fingerprint`.
    pub fn is_duplicate(&self, fingerprint: &ContentDigest) -> bool {
        self.index.is_duplicate(fingerprint)
    }

    /// The duplicate index.
    pub fn index(&self) -> &DuplicateIndex {
        &self.index
    }

    /// Every license ever granted, oldest first.
    pub fn licenses(&self) -> &[License] {
        &self.licenses
    }

    /// The newest license `buyer` holds on `listing`, if still active.
    pub fn active_license(
        &self,
        buyer: &Identity,
        listing: ListingId,
        now: Timestamp,
    ) -> Option<&License> {
        self.latest_license
            .get(&(buyer.clone(), listing))
            .and_then(|pos| self.licenses.get(*pos))
            .filter(|license| license.is_active_at(now))
    }

    /// The balance table.
    pub fn balances(&self) -> &Balances {
        &self.balances
    }

    /// Balance of `identity`.
    pub fn balance_of(&self, identity: &Identity) -> u64 {
        self.balances.balance_of(identity)
    }

    /// Id the next listing will receive.
    pub fn next_listing_id(&self) -> ListingId {
        self.next_listing_id
    }

    // ── Balance transitions ─────────────────────────────────────────

    /// Credit `amount` to `identity`.
    pub fn deposit(&mut self, identity: &Identity, amount: u64) -> Result<u64, MarketError> {
        if amount == 0 {
            return Err(MarketError::InvalidMetadata(
                "deposit amount must be greater than zero".into(),
            ));
        }
        self.balances.credit(identity, amount)
    }

    /// Credit the one-time top-up.
    pub fn claim_top_up(&mut self, identity: &Identity, amount: u64) -> Result<u64, MarketError> {
        self.balances.claim_top_up(identity, amount)
    }

    pub(crate) fn push_license(&mut self, license: License) {
        let key = (license.buyer.clone(), license.listing_id);
        self.licenses.push(license);
        self.latest_license.insert(key, self.licenses.len() - 1);
    }
}
