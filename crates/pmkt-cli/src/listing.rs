//! # Listing Subcommands
//!
//! `fingerprint`, `list`, `edit`, `remove`, and `show`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use pmkt_core::{fingerprint, Identity, ListingId};
use pmkt_ledger::{ItemKind, ListingMetadata};

use crate::session::SessionOptions;
use crate::{inspect, mutate, parse_listing_id, read_content};

/// Arguments for `pmkt fingerprint`.
#[derive(Args, Debug)]
pub struct FingerprintArgs {
    /// File to fingerprint.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
    /// How to read the file; text prompts get line-ending normalization.
    #[arg(long, default_value = "text-prompt")]
    pub kind: ItemKind,
}

/// Descriptive fields shared by `list` and `edit`.
#[derive(Args, Debug, Default)]
pub struct MetadataArgs {
    /// Listing title.
    #[arg(long)]
    pub title: Option<String>,
    /// Listing description.
    #[arg(long)]
    pub description: Option<String>,
    /// Category label.
    #[arg(long)]
    pub category: Option<String>,
    /// License terms recorded with the fingerprint.
    #[arg(long)]
    pub terms: Option<String>,
    /// Royalty percentage (0-100).
    #[arg(long)]
    pub royalty: Option<u8>,
    /// Thumbnail reference. Repeatable.
    #[arg(long = "thumbnail", value_name = "REF")]
    pub thumbnails: Vec<String>,
}

impl MetadataArgs {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.terms.is_none()
            && self.royalty.is_none()
            && self.thumbnails.is_empty()
    }

    fn apply(&self, metadata: &mut ListingMetadata) {
        if let Some(title) = &self.title {
            metadata.title = title.clone();
        }
        if let Some(description) = &self.description {
            metadata.description = description.clone();
        }
        if let Some(category) = &self.category {
            metadata.category = category.clone();
        }
        if let Some(terms) = &self.terms {
            metadata.license_terms = terms.clone();
        }
        if let Some(royalty) = self.royalty {
            metadata.royalty_percent = royalty;
        }
        if !self.thumbnails.is_empty() {
            metadata.thumbnails = self.thumbnails.clone();
        }
    }
}

/// Arguments for `pmkt list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Seller identity.
    #[arg(long = "as", value_name = "IDENTITY")]
    pub identity: Identity,
    /// Content file.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
    /// Price in minor units.
    #[arg(long, allow_negative_numbers = true)]
    pub price: i64,
    /// Item kind: text-prompt, dataset, or generated-output.
    #[arg(long, default_value = "text-prompt")]
    pub kind: ItemKind,
    #[command(flatten)]
    pub metadata: MetadataArgs,
}

/// Arguments for `pmkt edit`.
#[derive(Args, Debug)]
pub struct EditArgs {
    /// Owner identity.
    #[arg(long = "as", value_name = "IDENTITY")]
    pub identity: Identity,
    /// Listing to edit.
    #[arg(value_parser = parse_listing_id)]
    pub listing: ListingId,
    /// New price in minor units.
    #[arg(long, allow_negative_numbers = true)]
    pub price: Option<i64>,
    /// New item kind.
    #[arg(long)]
    pub kind: Option<ItemKind>,
    /// Replacement content file.
    #[arg(long, value_name = "FILE")]
    pub content: Option<PathBuf>,
    #[command(flatten)]
    pub metadata: MetadataArgs,
}

/// Arguments for `pmkt remove`.
#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Owner identity.
    #[arg(long = "as", value_name = "IDENTITY")]
    pub identity: Identity,
    /// Listing to remove.
    #[arg(value_parser = parse_listing_id)]
    pub listing: ListingId,
}

/// Arguments for `pmkt show`.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Listing to show.
    #[arg(value_parser = parse_listing_id)]
    pub listing: ListingId,
}

/// Print the fingerprint of a file and whether an active listing holds it.
pub fn run_fingerprint(args: &FingerprintArgs, opts: &SessionOptions) -> Result<u8> {
    let content = read_content(&args.file, args.kind)?;
    let digest = fingerprint(&content);
    inspect(opts, |market| {
        let listed = market.check_duplicate(&digest);
        println!("{digest} listed={listed}");
        Ok(0)
    })
}

/// Fingerprint, upload, and list a file.
pub fn run_list(args: &ListArgs, opts: &SessionOptions) -> Result<u8> {
    let content = read_content(&args.file, args.kind)?;
    let digest = fingerprint(&content);
    let title = match &args.metadata.title {
        Some(title) => title.clone(),
        None => args
            .file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .context("--title is required when the file has no name")?,
    };
    let mut metadata = ListingMetadata::new(title, args.kind);
    args.metadata.apply(&mut metadata);

    mutate(opts, |market| {
        let id = market.submit_listing(&args.identity, metadata, args.price, content)?;
        println!("OK: listed {id} fingerprint={digest}");
        Ok(0)
    })
}

/// Edit metadata, price, or content of a listing.
pub fn run_edit(args: &EditArgs, opts: &SessionOptions) -> Result<u8> {
    mutate(opts, |market| {
        let current = market.get_listing(args.listing)?;
        let kind = args.kind.unwrap_or(current.metadata.kind);
        let metadata = if args.metadata.is_empty() && args.kind.is_none() {
            None
        } else {
            let mut metadata = current.metadata.clone();
            metadata.kind = kind;
            args.metadata.apply(&mut metadata);
            Some(metadata)
        };
        let content = args
            .content
            .as_deref()
            .map(|path| read_content(path, kind))
            .transpose()?;
        market.edit_listing(args.listing, &args.identity, metadata, args.price, content)?;
        println!("OK: updated {}", args.listing);
        Ok(0)
    })
}

/// Remove a listing.
pub fn run_remove(args: &RemoveArgs, opts: &SessionOptions) -> Result<u8> {
    mutate(opts, |market| {
        market.remove_listing(args.listing, &args.identity)?;
        println!("OK: removed {}", args.listing);
        Ok(0)
    })
}

/// Print the public summary of a listing as JSON.
pub fn run_show(args: &ShowArgs, opts: &SessionOptions) -> Result<u8> {
    inspect(opts, |market| {
        let summary = market.listing_summary(args.listing)?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        Ok(0)
    })
}
