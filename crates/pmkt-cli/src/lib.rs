//! # pmkt-cli — Marketplace Command-Line Interface
//!
//! Drives a local marketplace: the ledger lives in a JSON snapshot file
//! and content lives in a blob directory.
//!
//! ## Subcommands
//!
//! - `fingerprint`, `list`, `edit`, `remove`, `show` — listings
//! - `buy`, `licenses`, `retrieve`, `verify` — licenses and content
//! - `deposit`, `balance`, `top-up` — balances
//!
//! ## Crate Policy
//!
//! - Argument parsing lives here; every rule lives in `pmkt-ledger`.
//! - A command that fails leaves the snapshot file untouched.
//! - Concurrent invocations on one state file are serialized by a lock.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use pmkt_core::{ContentBytes, ListingId};
use pmkt_crypto::FsBlobStore;
use pmkt_ledger::{ItemKind, Marketplace};

pub mod account;
pub mod license;
pub mod listing;
pub mod session;

use session::{LockMode, Session, SessionOptions};

/// Run `op` against the ledger and save the snapshot if it succeeds. The
/// state file stays exclusively locked from load to save.
pub fn mutate(
    opts: &SessionOptions,
    op: impl FnOnce(&Marketplace<FsBlobStore>) -> Result<u8>,
) -> Result<u8> {
    let session = Session::open(opts, LockMode::Exclusive)?;
    let code = op(session.market())?;
    session.save()?;
    Ok(code)
}

/// Run a read-only `op` against the ledger.
pub fn inspect(
    opts: &SessionOptions,
    op: impl FnOnce(&Marketplace<FsBlobStore>) -> Result<u8>,
) -> Result<u8> {
    let session = Session::open(opts, LockMode::Shared)?;
    op(session.market())
}

/// Parse `7` or `listing:7`.
pub fn parse_listing_id(s: &str) -> Result<ListingId, String> {
    let digits = s.strip_prefix("listing:").unwrap_or(s);
    digits
        .parse::<u64>()
        .map(ListingId)
        .map_err(|_| format!("invalid listing id {s:?}"))
}

/// Read a content file. Text prompts that are valid UTF-8 get their line
/// endings normalized; everything else is taken byte for byte.
pub fn read_content(path: &Path, kind: ItemKind) -> Result<ContentBytes> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read content: {}", path.display()))?;
    Ok(match kind {
        ItemKind::TextPrompt => match String::from_utf8(bytes) {
            Ok(text) => ContentBytes::from_text(&text),
            Err(raw) => ContentBytes::new(raw.into_bytes()),
        },
        ItemKind::Dataset | ItemKind::GeneratedOutput => ContentBytes::new(bytes),
    })
}
