//! # Balance Subcommands
//!
//! `deposit`, `balance`, and `top-up`.

use anyhow::Result;
use clap::Args;

use pmkt_core::Identity;

use crate::session::SessionOptions;
use crate::{inspect, mutate};

/// Arguments for `pmkt deposit`.
#[derive(Args, Debug)]
pub struct DepositArgs {
    /// Identity to credit.
    #[arg(long = "as", value_name = "IDENTITY")]
    pub identity: Identity,
    /// Amount in minor units.
    pub amount: u64,
}

/// Arguments for `pmkt balance` and `pmkt top-up`.
#[derive(Args, Debug)]
pub struct AccountArgs {
    #[arg(long = "as", value_name = "IDENTITY")]
    pub identity: Identity,
}

/// Credit an identity.
pub fn run_deposit(args: &DepositArgs, opts: &SessionOptions) -> Result<u8> {
    mutate(opts, |market| {
        let balance = market.deposit(&args.identity, args.amount)?;
        println!("OK: {} balance={balance}", args.identity);
        Ok(0)
    })
}

/// Print an identity's balance and top-up status.
pub fn run_balance(args: &AccountArgs, opts: &SessionOptions) -> Result<u8> {
    inspect(opts, |market| {
        println!(
            "{} balance={} top_up_claimed={}",
            args.identity,
            market.balance_of(&args.identity),
            market.has_claimed_top_up(&args.identity)
        );
        Ok(0)
    })
}

/// Claim the one-time top-up.
pub fn run_top_up(args: &AccountArgs, opts: &SessionOptions) -> Result<u8> {
    mutate(opts, |market| {
        let balance = market.claim_top_up(&args.identity)?;
        println!("OK: {} balance={balance}", args.identity);
        Ok(0)
    })
}
