//! # pmkt CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pmkt_cli::account::{run_balance, run_deposit, run_top_up, AccountArgs, DepositArgs};
use pmkt_cli::license::{
    run_buy, run_licenses, run_retrieve, run_verify, BuyArgs, LicensesArgs, RetrieveArgs,
    VerifyArgs,
};
use pmkt_cli::listing::{
    run_edit, run_fingerprint, run_list, run_remove, run_show, EditArgs, FingerprintArgs,
    ListArgs, RemoveArgs, ShowArgs,
};
use pmkt_cli::session::SessionOptions;

/// Provenance marketplace CLI.
///
/// Lists digital content under a content fingerprint, sells licenses,
/// gates retrieval, and verifies stored content against its registration.
#[derive(Parser, Debug)]
#[command(name = "pmkt", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Ledger snapshot file.
    #[arg(long, global = true, default_value = "pmkt-state.json")]
    state: PathBuf,

    /// Blob directory.
    #[arg(long, global = true, default_value = "pmkt-blobs")]
    blobs: PathBuf,

    /// YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a file's content fingerprint.
    Fingerprint(FingerprintArgs),
    /// List a file for sale.
    List(ListArgs),
    /// Edit a listing's metadata, price, or content.
    Edit(EditArgs),
    /// Remove a listing.
    Remove(RemoveArgs),
    /// Show a listing's public summary.
    Show(ShowArgs),
    /// Buy a license.
    Buy(BuyArgs),
    /// List licenses bought, or sold on one listing.
    Licenses(LicensesArgs),
    /// Retrieve licensed content.
    Retrieve(RetrieveArgs),
    /// Verify stored content against its registration.
    Verify(VerifyArgs),
    /// Credit a balance.
    Deposit(DepositArgs),
    /// Show a balance.
    Balance(AccountArgs),
    /// Claim the one-time top-up.
    TopUp(AccountArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let opts = SessionOptions {
        state: cli.state,
        blobs: cli.blobs,
        config: cli.config,
    };

    let result = match &cli.command {
        Commands::Fingerprint(args) => run_fingerprint(args, &opts),
        Commands::List(args) => run_list(args, &opts),
        Commands::Edit(args) => run_edit(args, &opts),
        Commands::Remove(args) => run_remove(args, &opts),
        Commands::Show(args) => run_show(args, &opts),
        Commands::Buy(args) => run_buy(args, &opts),
        Commands::Licenses(args) => run_licenses(args, &opts),
        Commands::Retrieve(args) => run_retrieve(args, &opts),
        Commands::Verify(args) => run_verify(args, &opts),
        Commands::Deposit(args) => run_deposit(args, &opts),
        Commands::Balance(args) => run_balance(args, &opts),
        Commands::TopUp(args) => run_top_up(args, &opts),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
