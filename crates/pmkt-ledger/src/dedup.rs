//! # Duplicate Index
//!
//! Maps each registered fingerprint to the one active listing that holds
//! it.
//!
//! ## Invariant
//!
//! A fingerprint appears at most once, and only while its listing is
//! active. Claims go through the map's entry API, so check-and-insert is a
//! single step; the ledger lock serializes callers across threads.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use pmkt_core::{ContentDigest, ListingId, MarketError};

use crate::model::ContentRecord;

/// Fingerprint → owning listing.
#[derive(Debug, Clone, Default)]
pub struct DuplicateIndex {
    by_fingerprint: HashMap<ContentDigest, ListingId>,
}

impl DuplicateIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from the content records of active listings.
    ///
    /// Two records sharing a fingerprint means the source state is corrupt.
    pub fn rebuild<'a>(
        records: impl IntoIterator<Item = &'a ContentRecord>,
    ) -> Result<Self, MarketError> {
        let mut index = Self::new();
        for record in records {
            if index.claim(&record.fingerprint, record.listing_id).is_err() {
                return Err(MarketError::Integrity(format!(
                    "fingerprint {} registered to more than one active listing",
                    record.fingerprint
                )));
            }
        }
        Ok(index)
    }

    /// Whether the fingerprint is held by an active listing.
    pub fn is_duplicate(&self, fingerprint: &ContentDigest) -> bool {
        self.by_fingerprint.contains_key(fingerprint)
    }

    /// Listing currently holding the fingerprint.
    pub fn holder(&self, fingerprint: &ContentDigest) -> Option<ListingId> {
        self.by_fingerprint.get(fingerprint).copied()
    }

    /// Register `fingerprint` for `listing`, or fail with `DuplicateContent`
    /// if another listing already holds it. Re-claiming one's own
    /// fingerprint is a no-op.
    pub fn claim(
        &mut self,
        fingerprint: &ContentDigest,
        listing: ListingId,
    ) -> Result<(), MarketError> {
        match self.by_fingerprint.entry(fingerprint.clone()) {
            Entry::Occupied(held) if *held.get() == listing => Ok(()),
            Entry::Occupied(_) => Err(MarketError::DuplicateContent),
            Entry::Vacant(slot) => {
                slot.insert(listing);
                Ok(())
            }
        }
    }

    /// Move `listing` from `old` to `new`. On `DuplicateContent` the index is
    /// unchanged and `listing` still holds `old`.
    pub fn readdress(
        &mut self,
        old: &ContentDigest,
        new: &ContentDigest,
        listing: ListingId,
    ) -> Result<(), MarketError> {
        self.claim(new, listing)?;
        if old != new {
            self.release(old, listing);
        }
        Ok(())
    }

    /// Drop `fingerprint` if `listing` holds it.
    pub fn release(&mut self, fingerprint: &ContentDigest, listing: ListingId) -> bool {
        match self.by_fingerprint.entry(fingerprint.clone()) {
            Entry::Occupied(held) if *held.get() == listing => {
                held.remove();
                true
            }
            _ => false,
        }
    }

    /// Number of registered fingerprints.
    pub fn len(&self) -> usize {
        self.by_fingerprint.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.by_fingerprint.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmkt_core::{fingerprint, ContentBytes};

    fn fp(text: &str) -> ContentDigest {
        fingerprint(&ContentBytes::from_text(text))
    }

    #[test]
    fn second_claim_is_duplicate() {
        let mut index = DuplicateIndex::new();
        index.claim(&fp("ALPHA"), ListingId(1)).unwrap();
        assert!(matches!(
            index.claim(&fp("ALPHA"), ListingId(2)),
            Err(MarketError::DuplicateContent)
        ));
        assert_eq!(index.holder(&fp("ALPHA")), Some(ListingId(1)));
        index.claim(&fp("ALPHA"), ListingId(1)).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn release_frees_fingerprint() {
        let mut index = DuplicateIndex::new();
        index.claim(&fp("ALPHA"), ListingId(1)).unwrap();
        assert!(!index.release(&fp("ALPHA"), ListingId(9)));
        assert!(index.release(&fp("ALPHA"), ListingId(1)));
        assert!(!index.is_duplicate(&fp("ALPHA")));
        index.claim(&fp("ALPHA"), ListingId(2)).unwrap();
    }

    #[test]
    fn readdress_into_taken_fingerprint_changes_nothing() {
        let mut index = DuplicateIndex::new();
        index.claim(&fp("ALPHA"), ListingId(1)).unwrap();
        index.claim(&fp("BETA"), ListingId(2)).unwrap();
        assert!(index
            .readdress(&fp("ALPHA"), &fp("BETA"), ListingId(1))
            .is_err());
        assert_eq!(index.holder(&fp("ALPHA")), Some(ListingId(1)));
        assert_eq!(index.holder(&fp("BETA")), Some(ListingId(2)));
    }

    #[test]
    fn readdress_moves_claim() {
        let mut index = DuplicateIndex::new();
        index.claim(&fp("ALPHA"), ListingId(1)).unwrap();
        index
            .readdress(&fp("ALPHA"), &fp("GAMMA"), ListingId(1))
            .unwrap();
        assert!(!index.is_duplicate(&fp("ALPHA")));
        assert_eq!(index.holder(&fp("GAMMA")), Some(ListingId(1)));
    }
}
