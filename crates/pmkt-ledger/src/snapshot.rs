//! # Ledger Snapshots
//!
//! Serializable image of every ledger table. The duplicate index and the
//! latest-license lookup are derived, so they are rebuilt on restore
//! rather than stored.
//!
//! ## Restore checks
//!
//! A snapshot is rejected with `Integrity` when:
//! - an active listing has no content record, or a record points at a
//!   removed or unknown listing;
//! - a record's fingerprint differs from its listing's;
//! - two active listings share a fingerprint;
//! - a license names an unknown listing;
//! - `next_listing_id` would reuse an existing id.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use pmkt_core::{Identity, ListingId, MarketError};

use crate::balances::Balances;
use crate::dedup::DuplicateIndex;
use crate::model::{ContentRecord, License, Listing};
use crate::state::{LedgerState, FIRST_LISTING_ID};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable ledger image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: u32,
    pub next_listing_id: ListingId,
    pub listings: Vec<Listing>,
    pub records: Vec<ContentRecord>,
    /// Oldest first.
    pub licenses: Vec<License>,
    pub balances: BTreeMap<Identity, u64>,
    pub top_ups: BTreeSet<Identity>,
}

impl Default for LedgerSnapshot {
    fn default() -> Self {
        LedgerState::new().to_snapshot()
    }
}

impl LedgerSnapshot {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, MarketError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse JSON. Structural checks happen on restore.
    pub fn from_json(json: &str) -> Result<Self, MarketError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl LedgerState {
    /// Copy every table into a snapshot.
    pub fn to_snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            version: SNAPSHOT_VERSION,
            next_listing_id: self.next_listing_id,
            listings: self.listings.values().cloned().collect(),
            records: self.records.values().cloned().collect(),
            licenses: self.licenses.clone(),
            balances: self.balances.accounts().clone(),
            top_ups: self.balances.top_ups().clone(),
        }
    }

    /// Rebuild a ledger from a snapshot, rejecting inconsistent images.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Result<Self, MarketError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(MarketError::Integrity(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }

        let mut listings = BTreeMap::new();
        for listing in snapshot.listings {
            let id = listing.id;
            if listings.insert(id, listing).is_some() {
                return Err(MarketError::Integrity(format!("{id} appears twice")));
            }
        }
        if let Some(max) = listings.keys().next_back() {
            if snapshot.next_listing_id <= *max {
                return Err(MarketError::Integrity(format!(
                    "next listing id {} would reuse {max}",
                    snapshot.next_listing_id
                )));
            }
        }
        if snapshot.next_listing_id < FIRST_LISTING_ID {
            return Err(MarketError::Integrity("next listing id must be positive".into()));
        }

        let mut records = BTreeMap::new();
        for record in snapshot.records {
            let id = record.listing_id;
            let listing = listings.get(&id).ok_or_else(|| {
                MarketError::Integrity(format!("content record for unknown {id}"))
            })?;
            if !listing.is_active() {
                return Err(MarketError::Integrity(format!(
                    "content record for removed {id}"
                )));
            }
            if listing.fingerprint != record.fingerprint {
                return Err(MarketError::Integrity(format!(
                    "content record fingerprint differs from {id}"
                )));
            }
            if records.insert(id, record).is_some() {
                return Err(MarketError::Integrity(format!("{id} has two content records")));
            }
        }
        if let Some(orphan) = listings
            .values()
            .find(|listing: &&Listing| listing.is_active() && !records.contains_key(&listing.id))
        {
            return Err(MarketError::Integrity(format!(
                "active {} has no content record",
                orphan.id
            )));
        }
        let index = DuplicateIndex::rebuild(records.values())?;

        let mut latest_license = HashMap::new();
        for (pos, license) in snapshot.licenses.iter().enumerate() {
            if !listings.contains_key(&license.listing_id) {
                return Err(MarketError::Integrity(format!(
                    "{} names unknown {}",
                    license.id, license.listing_id
                )));
            }
            latest_license.insert((license.buyer.clone(), license.listing_id), pos);
        }

        Ok(Self {
            next_listing_id: snapshot.next_listing_id,
            listings,
            records,
            index,
            licenses: snapshot.licenses,
            latest_license,
            balances: Balances::from_parts(snapshot.balances, snapshot.top_ups),
        })
    }
}
