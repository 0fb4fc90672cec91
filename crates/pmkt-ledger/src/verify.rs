//! # Content Verification
//!
//! Re-derives a listing's fingerprint from the bytes the blob store serves
//! today and compares it with the registered content record.
//!
//! Verification never fails: a missing record, an unreachable blob, and a
//! mismatch are all reported in the [`VerificationResult`]. A result is
//! only `matched` when the recomputed fingerprint equals the registered
//! one **and** the registered owner is still the listing's owner.
//!
//! The blob fetch runs without holding the ledger lock; callers capture a
//! [`VerificationTarget`] under the read lock and hand it here.

use serde::{Deserialize, Serialize};

use pmkt_core::{fingerprint, ContentBytes, ContentDigest, Identity, ListingId, Timestamp};
use pmkt_crypto::{digests_match, BlobLocator, BlobStore};

use crate::model::ContentRecord;
use crate::retry::with_retries;
use crate::state::LedgerState;

/// What the ledger knew about a listing when verification started.
#[derive(Debug, Clone)]
pub struct VerificationTarget {
    pub listing_id: ListingId,
    pub record: Option<ContentRecord>,
    pub current_owner: Option<Identity>,
    pub locator: Option<BlobLocator>,
}

/// Outcome of verifying one listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub listing_id: ListingId,
    /// Fingerprint and owner both agree with the record.
    pub matched: bool,
    /// The recomputed fingerprint equals the registered one.
    pub hash_match: bool,
    /// The registered owner is the listing's current owner.
    pub owner_match: bool,
    /// The registered record, absent for removed or unknown listings.
    pub record: Option<ContentRecord>,
    /// Fingerprint of the bytes fetched during this check.
    pub recomputed: Option<ContentDigest>,
    pub message: String,
    pub checked_at: Timestamp,
}

impl LedgerState {
    /// Capture what verification needs from the ledger.
    pub fn verification_target(&self, id: ListingId) -> VerificationTarget {
        let listing = self.listing(id).ok().filter(|listing| listing.is_active());
        VerificationTarget {
            listing_id: id,
            record: self.content_record(id).cloned(),
            current_owner: listing.map(|listing| listing.owner.clone()),
            locator: listing.map(|listing| listing.blob.retrieval_locator.clone()),
        }
    }
}

/// Fetches blobs and reconciles them against content records.
pub struct VerificationService<'a, B: BlobStore + ?Sized> {
    blobs: &'a B,
    attempts: u32,
}

impl<'a, B: BlobStore + ?Sized> VerificationService<'a, B> {
    /// `attempts` bounds retries of the blob fetch.
    pub fn new(blobs: &'a B, attempts: u32) -> Self {
        Self { blobs, attempts }
    }

    /// Verify one listing.
    pub fn verify(&self, target: VerificationTarget, now: Timestamp) -> VerificationResult {
        let VerificationTarget {
            listing_id,
            record,
            current_owner,
            locator,
        } = target;

        let (Some(record), Some(locator)) = (record, locator) else {
            return VerificationResult {
                listing_id,
                matched: false,
                hash_match: false,
                owner_match: false,
                record: None,
                recomputed: None,
                message: "no on-chain record for this listing".into(),
                checked_at: now,
            };
        };

        let owner_match = current_owner.as_ref() == Some(&record.owner);
        let bytes = match with_retries(self.attempts, "verify fetch", || {
            self.blobs.fetch(&locator)
        }) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(listing_id = %listing_id, error = %err, "verification fetch failed");
                return VerificationResult {
                    listing_id,
                    matched: false,
                    hash_match: false,
                    owner_match,
                    record: Some(record),
                    recomputed: None,
                    message: format!("content unavailable, retry later: {err}"),
                    checked_at: now,
                };
            }
        };

        let recomputed = fingerprint(&ContentBytes::new(bytes));
        let hash_match = digests_match(&recomputed, &record.fingerprint);
        let message = match (hash_match, owner_match) {
            (true, true) => "content matches the registered fingerprint",
            (false, _) => "content does not match the registered fingerprint",
            (true, false) => "registered owner differs from the current listing owner",
        };
        VerificationResult {
            listing_id,
            matched: hash_match && owner_match,
            hash_match,
            owner_match,
            record: Some(record),
            recomputed: Some(recomputed),
            message: message.into(),
            checked_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmkt_crypto::MemoryBlobStore;

    fn id(s: &str) -> Identity {
        Identity::new(s).unwrap()
    }

    fn now() -> Timestamp {
        Timestamp::from_epoch_secs(100).unwrap()
    }

    fn stored(store: &MemoryBlobStore, bytes: &[u8]) -> BlobLocator {
        let ticket = store.begin_upload(bytes.len() as u64, "text/plain").unwrap();
        store.write(&ticket.write_location, bytes).unwrap();
        ticket.retrieval_locator
    }

    fn target(store: &MemoryBlobStore, text: &str, owner: &str) -> VerificationTarget {
        let locator = stored(store, text.as_bytes());
        VerificationTarget {
            listing_id: ListingId(1),
            record: Some(ContentRecord {
                listing_id: ListingId(1),
                fingerprint: fingerprint(&ContentBytes::from_text(text)),
                owner: id("seller"),
                license_terms: String::new(),
                royalty_percent: 0,
                verified: true,
                registered_at: now(),
            }),
            current_owner: Some(id(owner)),
            locator: Some(locator),
        }
    }

    #[test]
    fn intact_content_matches() {
        let store = MemoryBlobStore::new();
        let result = VerificationService::new(&store, 1).verify(target(&store, "ALPHA", "seller"), now());
        assert!(result.matched);
        assert_eq!(result.recomputed, result.record.as_ref().map(|r| r.fingerprint.clone()));
    }

    #[test]
    fn tampered_content_does_not_match() {
        let store = MemoryBlobStore::new();
        let t = target(&store, "ALPHA", "seller");
        let locator = t.locator.clone().unwrap();
        store.tamper(&locator, b"ALPHA!".to_vec());
        let result = VerificationService::new(&store, 1).verify(t, now());
        assert!(!result.matched);
        assert!(!result.hash_match);
        assert!(result.owner_match);
    }

    #[test]
    fn owner_change_does_not_match() {
        let store = MemoryBlobStore::new();
        let result = VerificationService::new(&store, 1).verify(target(&store, "ALPHA", "mallory"), now());
        assert!(result.hash_match);
        assert!(!result.matched);
    }

    #[test]
    fn missing_record_reported_as_data() {
        let store = MemoryBlobStore::new();
        let result = VerificationService::new(&store, 1).verify(
            VerificationTarget {
                listing_id: ListingId(9),
                record: None,
                current_owner: None,
                locator: None,
            },
            now(),
        );
        assert!(!result.matched);
        assert!(result.record.is_none());
        assert!(result.message.contains("no on-chain record"));
    }

    #[test]
    fn unavailable_blob_reported_as_data() {
        let store = MemoryBlobStore::new();
        let t = target(&store, "ALPHA", "seller");
        store.fail_next_fetches(5);
        let result = VerificationService::new(&store, 2).verify(t, now());
        assert!(!result.matched);
        assert!(result.record.is_some());
        assert!(result.message.contains("unavailable"));
    }

    #[test]
    fn transient_fetch_failure_retried() {
        let store = MemoryBlobStore::new();
        let t = target(&store, "ALPHA", "seller");
        store.fail_next_fetches(1);
        assert!(VerificationService::new(&store, 2).verify(t, now()).matched);
    }
}
