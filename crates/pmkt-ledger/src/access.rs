//! # Access Gate
//!
//! Decides whether an identity may retrieve a listing's bytes.
//!
//! An identity qualifies if it owns the listing or holds an active license
//! for it. Everyone else is denied with `Forbidden`, and a listing that
//! does not exist is denied the same way, so the answer never reveals
//! whether an id is in use. `ListingRemoved` is only reported to callers
//! who would otherwise qualify.

use pmkt_core::{Identity, LicenseId, ListingId, MarketError, Timestamp};
use pmkt_crypto::BlobLocator;

use crate::state::LedgerState;

/// Outcome of an access decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The caller owns the active listing.
    Owner,
    /// The caller holds this active license.
    Licensed(LicenseId),
    /// The caller would qualify, but the listing was removed.
    Removed,
    /// No basis for access, or no such listing.
    Denied,
}

impl Access {
    /// Whether the decision allows retrieval.
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Owner | Self::Licensed(_))
    }
}

/// Read-only view over the ledger that answers access questions.
#[derive(Debug, Clone, Copy)]
pub struct AccessGate<'a> {
    state: &'a LedgerState,
}

impl<'a> AccessGate<'a> {
    pub fn new(state: &'a LedgerState) -> Self {
        Self { state }
    }

    /// Classify `identity`'s access to `id` at `now`.
    pub fn decide(&self, identity: &Identity, id: ListingId, now: Timestamp) -> Access {
        let Ok(listing) = self.state.listing(id) else {
            return Access::Denied;
        };
        let basis = if &listing.owner == identity {
            Some(Access::Owner)
        } else {
            self.state
                .active_license(identity, id, now)
                .map(|license| Access::Licensed(license.id))
        };
        match basis {
            Some(_) if !listing.is_active() => Access::Removed,
            Some(access) => access,
            None => Access::Denied,
        }
    }

    /// Whether `identity` may retrieve `id` right now.
    pub fn can_retrieve(&self, identity: &Identity, id: ListingId, now: Timestamp) -> bool {
        self.decide(identity, id, now).is_granted()
    }

    /// The retrieval locator, if access is granted.
    pub fn authorize(
        &self,
        identity: &Identity,
        id: ListingId,
        now: Timestamp,
    ) -> Result<&'a BlobLocator, MarketError> {
        match self.decide(identity, id, now) {
            Access::Owner | Access::Licensed(_) => self
                .state
                .listing(id)
                .map(|listing| &listing.blob.retrieval_locator),
            Access::Removed => Err(MarketError::ListingRemoved(id)),
            Access::Denied => Err(MarketError::Forbidden),
        }
    }
}
