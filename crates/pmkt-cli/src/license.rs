//! # License and Content Subcommands
//!
//! `buy`, `licenses`, `retrieve`, and `verify`. `verify` exits with 1 when
//! the stored bytes no longer match the registered fingerprint.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use pmkt_core::{Identity, ListingId};
use pmkt_ledger::License;

use crate::session::SessionOptions;
use crate::{inspect, mutate, parse_listing_id};

/// Arguments for `pmkt buy`.
#[derive(Args, Debug)]
pub struct BuyArgs {
    /// Buyer identity.
    #[arg(long = "as", value_name = "IDENTITY")]
    pub identity: Identity,
    /// Listing to buy.
    #[arg(value_parser = parse_listing_id)]
    pub listing: ListingId,
}

/// Arguments for `pmkt licenses`.
#[derive(Args, Debug)]
pub struct LicensesArgs {
    /// Identity whose purchases to list, or the owner when `--listing` is set.
    #[arg(long = "as", value_name = "IDENTITY")]
    pub identity: Identity,
    /// List the licenses sold on this listing instead. Owner only.
    #[arg(long, value_parser = parse_listing_id)]
    pub listing: Option<ListingId>,
}

/// Arguments for `pmkt retrieve`.
#[derive(Args, Debug)]
pub struct RetrieveArgs {
    /// Caller identity.
    #[arg(long = "as", value_name = "IDENTITY")]
    pub identity: Identity,
    /// Listing to retrieve.
    #[arg(value_parser = parse_listing_id)]
    pub listing: ListingId,
    /// Write the content here instead of stdout.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub out: Option<PathBuf>,
}

/// Arguments for `pmkt verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Listing to verify.
    #[arg(value_parser = parse_listing_id)]
    pub listing: ListingId,
}

/// Buy a license.
pub fn run_buy(args: &BuyArgs, opts: &SessionOptions) -> Result<u8> {
    mutate(opts, |market| {
        let license = market.purchase_license(&args.identity, args.listing)?;
        println!(
            "OK: {license} for {} balance={}",
            args.listing,
            market.balance_of(&args.identity)
        );
        Ok(0)
    })
}

/// List licenses, one per line.
pub fn run_licenses(args: &LicensesArgs, opts: &SessionOptions) -> Result<u8> {
    inspect(opts, |market| {
        let licenses = match args.listing {
            Some(listing) => market.licenses_for_listing(&args.identity, listing)?,
            None => market.list_licenses_for(&args.identity),
        };
        let now = market.now();
        for license in &licenses {
            println!("{}", describe(license, now));
        }
        Ok(0)
    })
}

/// Fetch content the caller owns or holds a license for.
pub fn run_retrieve(args: &RetrieveArgs, opts: &SessionOptions) -> Result<u8> {
    inspect(opts, |market| {
        let bytes = market.retrieve_content(&args.identity, args.listing)?;
        match &args.out {
            Some(path) => {
                std::fs::write(path, &bytes)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("OK: wrote {} bytes to {}", bytes.len(), path.display());
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(&bytes)?;
                stdout.flush()?;
            }
        }
        Ok(0)
    })
}

/// Re-fingerprint stored content and compare with the registered record.
pub fn run_verify(args: &VerifyArgs, opts: &SessionOptions) -> Result<u8> {
    inspect(opts, |market| {
        let result = market.verify_listing(args.listing);
        let status = if result.matched { "MATCH" } else { "MISMATCH" };
        println!("{status}: {} {}", result.listing_id, result.message);
        if let Some(record) = &result.record {
            println!("  registered {} owner={}", record.fingerprint, record.owner);
        }
        if let Some(recomputed) = &result.recomputed {
            println!("  recomputed {recomputed}");
        }
        Ok(if result.matched { 0 } else { 1 })
    })
}

fn describe(license: &License, now: pmkt_core::Timestamp) -> String {
    let expiry = match license.expires_at {
        Some(at) => format!("expires={at}"),
        None => "perpetual".to_string(),
    };
    let state = if license.is_active_at(now) {
        "active"
    } else {
        "expired"
    };
    format!(
        "{} {} buyer={} paid={} {expiry} {state}",
        license.id, license.listing_id, license.buyer, license.price_paid
    )
}
