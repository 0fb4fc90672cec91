//! # Listing Lifecycle
//!
//! ```text
//! create ──▶ Active ──(edit)──▶ Active
//!              │
//!              └──(remove)──▶ Removed (terminal)
//! ```
//!
//! ## Invariants
//!
//! - The owner is fixed at creation. Only the owner may edit or remove.
//! - An active listing has exactly one content record, and its fingerprint
//!   is claimed in the duplicate index. Removing the listing drops both, so
//!   the same bytes may be listed again.
//! - A removed listing stays in the table so licenses granted against it
//!   keep resolving. It cannot be edited, removed again, or bought.

use pmkt_core::{ContentDigest, Identity, ListingId, MarketError, Timestamp};

use crate::model::{
    BlobRef, ContentRecord, Listing, ListingMetadata, ListingStatus, Price, MAX_RATING,
};
use crate::state::LedgerState;

/// Input to [`LedgerState::create_listing`].
#[derive(Debug, Clone)]
pub struct NewListing {
    pub owner: Identity,
    pub metadata: ListingMetadata,
    pub price: i64,
    pub fingerprint: ContentDigest,
    pub blob: BlobRef,
}

/// New content for an existing listing.
#[derive(Debug, Clone)]
pub struct Readdress {
    pub fingerprint: ContentDigest,
    pub blob: BlobRef,
}

/// Input to [`LedgerState::update_listing`]. `None` fields keep their
/// current value.
#[derive(Debug, Clone, Default)]
pub struct ListingUpdate {
    pub metadata: Option<ListingMetadata>,
    pub price: Option<i64>,
    pub content: Option<Readdress>,
}

impl LedgerState {
    /// Register a new active listing and claim its fingerprint.
    pub fn create_listing(
        &mut self,
        new: NewListing,
        now: Timestamp,
    ) -> Result<ListingId, MarketError> {
        let price = Price::new(new.price)?;
        new.metadata.validate()?;

        let id = self.next_listing_id;
        if self.listings.contains_key(&id) {
            return Err(MarketError::Integrity(format!("{id} already allocated")));
        }
        self.index.claim(&new.fingerprint, id)?;

        let listing = Listing {
            id,
            owner: new.owner,
            metadata: new.metadata,
            fingerprint: new.fingerprint,
            price,
            blob: new.blob,
            status: ListingStatus::Active,
            created_at: now,
            updated_at: now,
            removed_at: None,
            views: 0,
            favorites: Default::default(),
            rating_sum: 0,
            rating_count: 0,
        };
        self.records
            .insert(id, ContentRecord::for_listing(&listing, now));
        self.listings.insert(id, listing);
        self.next_listing_id = id.next();
        Ok(id)
    }

    /// Edit an active listing the caller owns.
    ///
    /// Returns `true` when the listing now points at the blob supplied in
    /// `update.content`. Supplying content whose fingerprint equals the
    /// current one keeps the existing blob and returns `false`.
    ///
    /// The content record is replaced only on a readdress. Metadata and
    /// price edits leave it as registered.
    pub fn update_listing(
        &mut self,
        id: ListingId,
        caller: &Identity,
        update: ListingUpdate,
        now: Timestamp,
    ) -> Result<bool, MarketError> {
        let listing = self.owned_active_listing(id, caller)?;
        let price = update.price.map(Price::new).transpose()?;
        if let Some(metadata) = &update.metadata {
            metadata.validate()?;
        }
        let current = listing.fingerprint.clone();
        let readdress = update
            .content
            .filter(|content| content.fingerprint != current);

        if let Some(content) = &readdress {
            self.index.readdress(&current, &content.fingerprint, id)?;
        }

        let listing = self
            .listings
            .get_mut(&id)
            .ok_or(MarketError::NotFound(id))?;
        if let Some(metadata) = update.metadata {
            listing.metadata = metadata;
        }
        if let Some(price) = price {
            listing.price = price;
        }
        listing.updated_at = now;
        let Some(content) = readdress else {
            return Ok(false);
        };
        listing.fingerprint = content.fingerprint;
        listing.blob = content.blob;
        self.records.insert(id, ContentRecord::for_listing(listing, now));
        Ok(true)
    }

    /// Soft-delete an active listing the caller owns. The fingerprint is
    /// released and the content record dropped; the blob is kept.
    pub fn delete_listing(
        &mut self,
        id: ListingId,
        caller: &Identity,
        now: Timestamp,
    ) -> Result<(), MarketError> {
        let fingerprint = self.owned_active_listing(id, caller)?.fingerprint.clone();
        let listing = self
            .listings
            .get_mut(&id)
            .ok_or(MarketError::NotFound(id))?;
        self.index.release(&fingerprint, id);
        self.records.remove(&id);
        listing.status = ListingStatus::Removed;
        listing.removed_at = Some(now);
        listing.updated_at = now;
        Ok(())
    }

    /// Count a view of an active listing. Returns the new view count.
    pub fn record_view(&mut self, id: ListingId) -> Result<u64, MarketError> {
        let listing = self.active_listing_mut(id)?;
        listing.views = listing.views.saturating_add(1);
        Ok(listing.views)
    }

    /// Fold one rating into an active listing's aggregate. Returns the new
    /// rating count.
    pub fn record_rating(&mut self, id: ListingId, stars: u8) -> Result<u64, MarketError> {
        if !(1..=MAX_RATING).contains(&stars) {
            return Err(MarketError::InvalidMetadata(format!(
                "rating must be between 1 and {MAX_RATING}, got {stars}"
            )));
        }
        let listing = self.active_listing_mut(id)?;
        let sum = listing
            .rating_sum
            .checked_add(u64::from(stars))
            .ok_or_else(|| MarketError::Integrity(format!("{id} rating sum overflow")))?;
        listing.rating_sum = sum;
        listing.rating_count += 1;
        Ok(listing.rating_count)
    }

    /// Flip `identity`'s favorite on an active listing. Returns whether the
    /// listing is now a favorite.
    pub fn toggle_favorite(
        &mut self,
        identity: &Identity,
        id: ListingId,
    ) -> Result<bool, MarketError> {
        let listing = self.active_listing_mut(id)?;
        if listing.favorites.remove(identity) {
            Ok(false)
        } else {
            listing.favorites.insert(identity.clone());
            Ok(true)
        }
    }

    pub(crate) fn owned_active_listing(
        &self,
        id: ListingId,
        caller: &Identity,
    ) -> Result<&Listing, MarketError> {
        let listing = self.listing(id)?;
        if &listing.owner != caller {
            return Err(MarketError::NotOwner(id));
        }
        if !listing.is_active() {
            return Err(MarketError::ListingRemoved(id));
        }
        Ok(listing)
    }

    fn active_listing_mut(&mut self, id: ListingId) -> Result<&mut Listing, MarketError> {
        let listing = self
            .listings
            .get_mut(&id)
            .ok_or(MarketError::NotFound(id))?;
        if !listing.is_active() {
            return Err(MarketError::ListingRemoved(id));
        }
        Ok(listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemKind;
    use pmkt_core::{fingerprint, ContentBytes};
    use pmkt_crypto::{BlobLocator, WriteLocation};

    fn id(s: &str) -> Identity {
        Identity::new(s).unwrap()
    }

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_epoch_secs(secs).unwrap()
    }

    fn blob(tag: &str) -> BlobRef {
        BlobRef {
            write_location: WriteLocation(format!("w-{tag}")),
            retrieval_locator: BlobLocator(format!("r-{tag}")),
            size: 5,
            content_type: "text/plain".into(),
        }
    }

    fn new_listing(owner: &str, text: &str, price: i64) -> NewListing {
        NewListing {
            owner: id(owner),
            metadata: ListingMetadata::new(format!("{text} prompt"), ItemKind::TextPrompt),
            price,
            fingerprint: fingerprint(&ContentBytes::from_text(text)),
            blob: blob(text),
        }
    }

    #[test]
    fn ids_are_monotonic() {
        let mut state = LedgerState::new();
        let a = state.create_listing(new_listing("s", "ALPHA", 10), at(0)).unwrap();
        let b = state.create_listing(new_listing("s", "BETA", 10), at(0)).unwrap();
        assert_eq!(a, ListingId(1));
        assert_eq!(b, ListingId(2));
        state.delete_listing(b, &id("s"), at(1)).unwrap();
        let c = state.create_listing(new_listing("s", "BETA", 10), at(2)).unwrap();
        assert_eq!(c, ListingId(3));
    }

    #[test]
    fn rejected_create_changes_nothing() {
        let mut state = LedgerState::new();
        state.create_listing(new_listing("s", "ALPHA", 10), at(0)).unwrap();

        let err = state
            .create_listing(new_listing("t", "ALPHA", 10), at(0))
            .unwrap_err();
        assert!(matches!(err, MarketError::DuplicateContent));
        let err = state
            .create_listing(new_listing("t", "GAMMA", 0), at(0))
            .unwrap_err();
        assert!(matches!(err, MarketError::InvalidPrice(0)));

        assert_eq!(state.listings().count(), 1);
        assert_eq!(state.next_listing_id(), ListingId(2));
        assert_eq!(state.index().len(), 1);
    }

    #[test]
    fn update_requires_owner_and_active() {
        let mut state = LedgerState::new();
        let a = state.create_listing(new_listing("s", "ALPHA", 10), at(0)).unwrap();
        let update = ListingUpdate {
            price: Some(20),
            ..Default::default()
        };
        assert!(matches!(
            state.update_listing(a, &id("mallory"), update.clone(), at(1)),
            Err(MarketError::NotOwner(_))
        ));
        assert!(matches!(
            state.update_listing(ListingId(99), &id("s"), update.clone(), at(1)),
            Err(MarketError::NotFound(_))
        ));
        state.delete_listing(a, &id("s"), at(2)).unwrap();
        assert!(matches!(
            state.update_listing(a, &id("s"), update, at(3)),
            Err(MarketError::ListingRemoved(_))
        ));
        assert!(matches!(
            state.delete_listing(a, &id("s"), at(3)),
            Err(MarketError::ListingRemoved(_))
        ));
    }

    #[test]
    fn price_edit_keeps_fingerprint_and_record() {
        let mut state = LedgerState::new();
        let a = state.create_listing(new_listing("s", "ALPHA", 10), at(0)).unwrap();
        let update = ListingUpdate {
            price: Some(25),
            ..Default::default()
        };
        assert!(!state.update_listing(a, &id("s"), update, at(5)).unwrap());
        let listing = state.listing(a).unwrap();
        assert_eq!(listing.price.amount(), 25);
        assert_eq!(listing.updated_at, at(5));
        assert_eq!(state.content_record(a).unwrap().registered_at, at(0));
    }

    #[test]
    fn ratings_aggregate_on_active_listings() {
        let mut state = LedgerState::new();
        let a = state.create_listing(new_listing("s", "ALPHA", 10), at(0)).unwrap();
        assert_eq!(state.listing(a).unwrap().average_rating(), None);

        assert_eq!(state.record_rating(a, 5).unwrap(), 1);
        assert_eq!(state.record_rating(a, 2).unwrap(), 2);
        assert_eq!(state.listing(a).unwrap().average_rating(), Some(3.5));

        for stars in [0, MAX_RATING + 1] {
            assert!(matches!(
                state.record_rating(a, stars),
                Err(MarketError::InvalidMetadata(_))
            ));
        }
        assert_eq!(state.listing(a).unwrap().rating_count, 2);

        state.delete_listing(a, &id("s"), at(1)).unwrap();
        assert!(matches!(
            state.record_rating(a, 4),
            Err(MarketError::ListingRemoved(_))
        ));
    }

    #[test]
    fn terms_edit_leaves_record_as_registered() {
        let mut state = LedgerState::new();
        let mut listing = new_listing("s", "ALPHA", 10);
        listing.metadata = listing.metadata.with_terms("personal use only", 5);
        let a = state.create_listing(listing, at(0)).unwrap();
        let registered = state.content_record(a).unwrap().clone();

        let relicensed = state
            .listing(a)
            .unwrap()
            .metadata
            .clone()
            .with_terms("commercial use ok", 50);
        let update = ListingUpdate {
            metadata: Some(relicensed),
            ..Default::default()
        };
        assert!(!state.update_listing(a, &id("s"), update, at(5)).unwrap());
        assert_eq!(state.listing(a).unwrap().metadata.royalty_percent, 50);
        assert_eq!(state.content_record(a).unwrap(), &registered);

        let update = ListingUpdate {
            content: Some(Readdress {
                fingerprint: fingerprint(&ContentBytes::from_text("GAMMA")),
                blob: blob("GAMMA"),
            }),
            ..Default::default()
        };
        assert!(state.update_listing(a, &id("s"), update, at(9)).unwrap());
        let record = state.content_record(a).unwrap();
        assert_eq!(record.license_terms, "commercial use ok");
        assert_eq!(record.royalty_percent, 50);
        assert_eq!(record.registered_at, at(9));
    }

    #[test]
    fn readdress_into_held_fingerprint_is_rejected_atomically() {
        let mut state = LedgerState::new();
        let a = state.create_listing(new_listing("s", "ALPHA", 10), at(0)).unwrap();
        state.create_listing(new_listing("t", "BETA", 10), at(0)).unwrap();
        let update = ListingUpdate {
            metadata: Some(ListingMetadata::new("renamed", ItemKind::Dataset)),
            price: Some(99),
            content: Some(Readdress {
                fingerprint: fingerprint(&ContentBytes::from_text("BETA")),
                blob: blob("BETA2"),
            }),
        };
        assert!(matches!(
            state.update_listing(a, &id("s"), update, at(1)),
            Err(MarketError::DuplicateContent)
        ));
        let listing = state.listing(a).unwrap();
        assert_eq!(listing.metadata.title, "ALPHA prompt");
        assert_eq!(listing.price.amount(), 10);
        assert_eq!(
            state.index().holder(&fingerprint(&ContentBytes::from_text("ALPHA"))),
            Some(a)
        );
    }

    #[test]
    fn readdress_moves_record() {
        let mut state = LedgerState::new();
        let a = state.create_listing(new_listing("s", "ALPHA", 10), at(0)).unwrap();
        let gamma = fingerprint(&ContentBytes::from_text("GAMMA"));
        let update = ListingUpdate {
            content: Some(Readdress {
                fingerprint: gamma.clone(),
                blob: blob("GAMMA"),
            }),
            ..Default::default()
        };
        assert!(state.update_listing(a, &id("s"), update, at(3)).unwrap());
        let record = state.content_record(a).unwrap();
        assert_eq!(record.fingerprint, gamma);
        assert_eq!(record.registered_at, at(3));
        assert!(!state.is_duplicate(&fingerprint(&ContentBytes::from_text("ALPHA"))));
        assert_eq!(state.listing(a).unwrap().blob, blob("GAMMA"));
    }

    #[test]
    fn same_content_edit_keeps_blob() {
        let mut state = LedgerState::new();
        let a = state.create_listing(new_listing("s", "ALPHA", 10), at(0)).unwrap();
        let update = ListingUpdate {
            content: Some(Readdress {
                fingerprint: fingerprint(&ContentBytes::from_text("ALPHA")),
                blob: blob("ALPHA-again"),
            }),
            ..Default::default()
        };
        assert!(!state.update_listing(a, &id("s"), update, at(1)).unwrap());
        assert_eq!(state.listing(a).unwrap().blob, blob("ALPHA"));
    }

    #[test]
    fn delete_is_soft() {
        let mut state = LedgerState::new();
        let a = state.create_listing(new_listing("s", "ALPHA", 10), at(0)).unwrap();
        state.delete_listing(a, &id("s"), at(9)).unwrap();
        let listing = state.listing(a).unwrap();
        assert_eq!(listing.status, ListingStatus::Removed);
        assert_eq!(listing.removed_at, Some(at(9)));
        assert!(state.content_record(a).is_none());
        assert!(state.index().is_empty());
    }

    #[test]
    fn views_and_favorites() {
        let mut state = LedgerState::new();
        let a = state.create_listing(new_listing("s", "ALPHA", 10), at(0)).unwrap();
        assert_eq!(state.record_view(a).unwrap(), 1);
        assert_eq!(state.record_view(a).unwrap(), 2);
        assert!(state.toggle_favorite(&id("b"), a).unwrap());
        assert!(state.toggle_favorite(&id("c"), a).unwrap());
        assert!(!state.toggle_favorite(&id("b"), a).unwrap());
        assert_eq!(state.listing(a).unwrap().favorite_count(), 1);
        assert!(matches!(
            state.record_view(ListingId(42)),
            Err(MarketError::NotFound(_))
        ));
    }
}
