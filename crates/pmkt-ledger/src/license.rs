//! # License Purchases
//!
//! A purchase is one state transition: the buyer is debited the full
//! price, the seller and the treasury are credited their shares, and a
//! license is appended. Either all of it happens or none of it does.
//!
//! ## Preconditions, in order
//!
//! 1. The listing exists (`NotFound`) and is active (`ListingRemoved`).
//! 2. The buyer is not the owner (`CannotBuyOwnItem`).
//! 3. The buyer holds no active license for it (`AlreadyLicensed`).
//! 4. The buyer's balance covers the price (`InsufficientFunds`).
//!
//! An expired license does not block a new purchase; the new grant is
//! appended and the old record is kept.

use pmkt_core::{Identity, LicenseId, ListingId, MarketError, Timestamp};

use crate::config::MarketConfig;
use crate::model::License;
use crate::state::LedgerState;

impl LedgerState {
    /// Buy a license on an active listing.
    pub fn purchase(
        &mut self,
        buyer: &Identity,
        id: ListingId,
        now: Timestamp,
        config: &MarketConfig,
    ) -> Result<License, MarketError> {
        let listing = self.listing(id)?;
        if !listing.is_active() {
            return Err(MarketError::ListingRemoved(id));
        }
        if &listing.owner == buyer {
            return Err(MarketError::CannotBuyOwnItem);
        }
        if self.active_license(buyer, id, now).is_some() {
            return Err(MarketError::AlreadyLicensed(id));
        }

        let seller = listing.owner.clone();
        let price = listing.price.amount();
        let split = config.fee_split(price);
        let expires_at = config
            .license_duration_secs
            .map(|secs| now.plus_secs(secs))
            .transpose()?;

        self.balances.settle(
            buyer,
            price,
            &[(&seller, split.seller), (&config.treasury, split.platform)],
        )?;

        let license = License {
            id: LicenseId::new(),
            listing_id: id,
            buyer: buyer.clone(),
            price_paid: price,
            seller_credit: split.seller,
            platform_fee: split.platform,
            created_at: now,
            expires_at,
        };
        self.push_license(license.clone());
        Ok(license)
    }

    /// Every license `identity` has bought, oldest first.
    pub fn licenses_for(&self, identity: &Identity) -> Vec<License> {
        self.licenses
            .iter()
            .filter(|license| &license.buyer == identity)
            .cloned()
            .collect()
    }

    /// Every license granted on a listing, oldest first. Owner only.
    pub fn licenses_for_listing(
        &self,
        caller: &Identity,
        id: ListingId,
    ) -> Result<Vec<License>, MarketError> {
        let listing = self.listing(id)?;
        if &listing.owner != caller {
            return Err(MarketError::NotOwner(id));
        }
        Ok(self
            .licenses
            .iter()
            .filter(|license| license.listing_id == id)
            .cloned()
            .collect())
    }

    /// Look up a license by id.
    pub fn license(&self, id: LicenseId) -> Option<&License> {
        self.licenses.iter().find(|license| license.id == id)
    }
}
