//! # Balances
//!
//! Per-identity balances in minor units. Absent identities hold zero.
//!
//! ## Invariant
//!
//! A settlement moves value without creating or destroying any: the sum
//! of all balances after a purchase equals the sum before. Every new
//! balance is computed with checked arithmetic before any is written, so a
//! failed settlement leaves the table untouched.

use std::collections::{BTreeMap, BTreeSet};

use pmkt_core::{Identity, MarketError};

/// Balance table plus the set of identities that claimed their top-up.
#[derive(Debug, Clone, Default)]
pub struct Balances {
    accounts: BTreeMap<Identity, u64>,
    top_ups: BTreeSet<Identity>,
}

impl Balances {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(
        accounts: BTreeMap<Identity, u64>,
        top_ups: BTreeSet<Identity>,
    ) -> Self {
        Self { accounts, top_ups }
    }

    /// Current balance of `identity`.
    pub fn balance_of(&self, identity: &Identity) -> u64 {
        self.accounts.get(identity).copied().unwrap_or(0)
    }

    /// Add `amount` to `identity`, returning the new balance.
    pub fn credit(&mut self, identity: &Identity, amount: u64) -> Result<u64, MarketError> {
        let next = self
            .balance_of(identity)
            .checked_add(amount)
            .ok_or(MarketError::BalanceOverflow)?;
        self.accounts.insert(identity.clone(), next);
        Ok(next)
    }

    /// Credit the one-time top-up. A second claim by the same identity
    /// fails with `TopUpAlreadyClaimed`.
    pub fn claim_top_up(&mut self, identity: &Identity, amount: u64) -> Result<u64, MarketError> {
        if self.top_ups.contains(identity) {
            return Err(MarketError::TopUpAlreadyClaimed);
        }
        let next = self.credit(identity, amount)?;
        self.top_ups.insert(identity.clone());
        Ok(next)
    }

    /// Whether `identity` has claimed its top-up.
    pub fn has_claimed_top_up(&self, identity: &Identity) -> bool {
        self.top_ups.contains(identity)
    }

    /// Debit `amount` from `payer` and credit each payee its share.
    ///
    /// The shares must sum to `amount`. Payer and payees may coincide.
    pub fn settle(
        &mut self,
        payer: &Identity,
        amount: u64,
        payees: &[(&Identity, u64)],
    ) -> Result<(), MarketError> {
        let shares = payees
            .iter()
            .try_fold(0u64, |acc, (_, share)| acc.checked_add(*share))
            .ok_or(MarketError::BalanceOverflow)?;
        if shares != amount {
            return Err(MarketError::Integrity(format!(
                "settlement shares {shares} do not sum to {amount}"
            )));
        }

        let available = self.balance_of(payer);
        let mut staged: BTreeMap<&Identity, u64> = BTreeMap::new();
        staged.insert(
            payer,
            available
                .checked_sub(amount)
                .ok_or(MarketError::InsufficientFunds {
                    required: amount,
                    available,
                })?,
        );
        for &(payee, share) in payees {
            let current = match staged.get(&payee) {
                Some(v) => *v,
                None => self.balance_of(payee),
            };
            let next = current
                .checked_add(share)
                .ok_or(MarketError::BalanceOverflow)?;
            staged.insert(payee, next);
        }

        for (identity, balance) in staged {
            self.accounts.insert(identity.clone(), balance);
        }
        Ok(())
    }

    /// Sum of all balances.
    pub fn total(&self) -> u128 {
        self.accounts.values().map(|v| u128::from(*v)).sum()
    }

    /// All non-default entries.
    pub fn accounts(&self) -> &BTreeMap<Identity, u64> {
        &self.accounts
    }

    /// Identities that claimed a top-up.
    pub fn top_ups(&self) -> &BTreeSet<Identity> {
        &self.top_ups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Identity {
        Identity::new(s).unwrap()
    }

    #[test]
    fn absent_identity_holds_zero() {
        assert_eq!(Balances::new().balance_of(&id("nobody")), 0);
    }

    #[test]
    fn top_up_once() {
        let mut balances = Balances::new();
        assert_eq!(balances.claim_top_up(&id("a"), 50).unwrap(), 50);
        assert!(balances.has_claimed_top_up(&id("a")));
        assert!(matches!(
            balances.claim_top_up(&id("a"), 50),
            Err(MarketError::TopUpAlreadyClaimed)
        ));
        assert_eq!(balances.balance_of(&id("a")), 50);
    }

    #[test]
    fn settle_moves_value() {
        let mut balances = Balances::new();
        balances.credit(&id("buyer"), 150).unwrap();
        balances
            .settle(&id("buyer"), 100, &[(&id("seller"), 95), (&id("house"), 5)])
            .unwrap();
        assert_eq!(balances.balance_of(&id("buyer")), 50);
        assert_eq!(balances.balance_of(&id("seller")), 95);
        assert_eq!(balances.balance_of(&id("house")), 5);
        assert_eq!(balances.total(), 150);
    }

    #[test]
    fn insufficient_funds_leaves_table_untouched() {
        let mut balances = Balances::new();
        balances.credit(&id("buyer"), 50).unwrap();
        let err = balances
            .settle(&id("buyer"), 100, &[(&id("seller"), 100)])
            .unwrap_err();
        assert!(matches!(
            err,
            MarketError::InsufficientFunds {
                required: 100,
                available: 50
            }
        ));
        assert_eq!(balances.balance_of(&id("buyer")), 50);
        assert_eq!(balances.balance_of(&id("seller")), 0);
    }

    #[test]
    fn overflowing_credit_leaves_table_untouched() {
        let mut balances = Balances::new();
        balances.credit(&id("buyer"), 10).unwrap();
        balances.credit(&id("seller"), u64::MAX).unwrap();
        assert!(matches!(
            balances.settle(&id("buyer"), 10, &[(&id("seller"), 10)]),
            Err(MarketError::BalanceOverflow)
        ));
        assert_eq!(balances.balance_of(&id("buyer")), 10);
    }

    #[test]
    fn payer_may_also_be_a_payee() {
        let mut balances = Balances::new();
        balances.credit(&id("house"), 100).unwrap();
        balances
            .settle(&id("house"), 100, &[(&id("seller"), 95), (&id("house"), 5)])
            .unwrap();
        assert_eq!(balances.balance_of(&id("house")), 5);
        assert_eq!(balances.total(), 100);
    }
}
