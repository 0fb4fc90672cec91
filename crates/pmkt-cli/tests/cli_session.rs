//! Handler-level tests: each call is one CLI invocation against a temp dir.

use std::fs;
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use pmkt_cli::account::{run_balance, run_deposit, run_top_up, AccountArgs, DepositArgs};
use pmkt_cli::license::{run_buy, run_retrieve, run_verify, BuyArgs, RetrieveArgs, VerifyArgs};
use pmkt_cli::listing::{run_edit, run_list, run_remove, EditArgs, ListArgs, MetadataArgs, RemoveArgs};
use pmkt_cli::session::{read_snapshot, LockMode, Session, SessionOptions};
use pmkt_core::{ContentBytes, Identity, ListingId, MarketError};
use pmkt_crypto::FsBlobStore;
use pmkt_ledger::{ItemKind, ListingMetadata};

fn id(s: &str) -> Identity {
    Identity::new(s).unwrap()
}

fn options(dir: &Path) -> SessionOptions {
    SessionOptions {
        state: dir.join("state.json"),
        blobs: dir.join("blobs"),
        config: None,
    }
}

fn list(opts: &SessionOptions, seller: &str, file: &Path, price: i64) -> anyhow::Result<u8> {
    run_list(
        &ListArgs {
            identity: id(seller),
            file: file.to_path_buf(),
            price,
            kind: ItemKind::TextPrompt,
            metadata: MetadataArgs {
                title: Some("alpha prompt".into()),
                ..MetadataArgs::default()
            },
        },
        opts,
    )
}

#[test]
fn list_buy_retrieve_verify() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(dir.path());
    let file = dir.path().join("alpha.txt");
    fs::write(&file, "ALPHA").unwrap();

    assert_eq!(list(&opts, "seller", &file, 100).unwrap(), 0);
    assert!(run_buy(
        &BuyArgs {
            identity: id("buyer"),
            listing: ListingId(1),
        },
        &opts,
    )
    .is_err());

    run_deposit(
        &DepositArgs {
            identity: id("buyer"),
            amount: 150,
        },
        &opts,
    )
    .unwrap();
    run_buy(
        &BuyArgs {
            identity: id("buyer"),
            listing: ListingId(1),
        },
        &opts,
    )
    .unwrap();

    let out = dir.path().join("out.txt");
    run_retrieve(
        &RetrieveArgs {
            identity: id("buyer"),
            listing: ListingId(1),
            out: Some(out.clone()),
        },
        &opts,
    )
    .unwrap();
    assert_eq!(fs::read(&out).unwrap(), b"ALPHA");

    let verify = VerifyArgs {
        listing: ListingId(1),
    };
    assert_eq!(run_verify(&verify, &opts).unwrap(), 0);

    let snapshot = read_snapshot(&opts.state).unwrap();
    assert_eq!(snapshot.balances[&id("buyer")], 50);
    assert_eq!(snapshot.balances[&id("seller")], 95);

    let locator = &snapshot.listings[0].blob.retrieval_locator;
    let path = FsBlobStore::new(&opts.blobs).blob_path(locator).unwrap();
    fs::write(path, "TAMPERED").unwrap();
    assert_eq!(run_verify(&verify, &opts).unwrap(), 1);
}

#[test]
fn failed_command_leaves_state_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(dir.path());
    let file = dir.path().join("alpha.txt");
    fs::write(&file, "ALPHA").unwrap();
    list(&opts, "seller", &file, 10).unwrap();
    let before = fs::read_to_string(&opts.state).unwrap();

    assert!(list(&opts, "other", &file, 10).is_err());
    assert!(list(&opts, "other", &dir.path().join("missing.txt"), 10).is_err());
    assert!(run_remove(
        &RemoveArgs {
            identity: id("other"),
            listing: ListingId(1),
        },
        &opts,
    )
    .is_err());
    assert_eq!(fs::read_to_string(&opts.state).unwrap(), before);
}

#[test]
fn edit_content_then_relist_old_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(dir.path());
    let alpha = dir.path().join("alpha.txt");
    let beta = dir.path().join("beta.txt");
    fs::write(&alpha, "ALPHA").unwrap();
    fs::write(&beta, "BETA").unwrap();
    list(&opts, "seller", &alpha, 10).unwrap();

    run_edit(
        &EditArgs {
            identity: id("seller"),
            listing: ListingId(1),
            price: Some(12),
            kind: None,
            content: Some(beta),
            metadata: MetadataArgs::default(),
        },
        &opts,
    )
    .unwrap();
    list(&opts, "other", &alpha, 10).unwrap();

    let snapshot = read_snapshot(&opts.state).unwrap();
    assert_eq!(snapshot.listings.len(), 2);
    assert_eq!(snapshot.listings[0].price.amount(), 12);
    assert_eq!(
        run_verify(
            &VerifyArgs {
                listing: ListingId(1)
            },
            &opts
        )
        .unwrap(),
        0
    );
}

#[test]
fn top_up_once_per_identity() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(dir.path());
    let me = AccountArgs {
        identity: id("newcomer"),
    };
    run_top_up(&me, &opts).unwrap();
    assert!(run_top_up(&me, &opts).is_err());
    assert_eq!(run_balance(&me, &opts).unwrap(), 0);
    let snapshot = read_snapshot(&opts.state).unwrap();
    assert_eq!(snapshot.balances[&id("newcomer")], 500_000_000);
}

#[test]
fn second_writer_waits_then_sees_duplicate() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(dir.path());
    let prompt = || ListingMetadata::new("alpha prompt", ItemKind::TextPrompt);

    let first = Session::open(&opts, LockMode::Exclusive).unwrap();
    let alice_listing = first
        .market()
        .submit_listing(&id("alice"), prompt(), 10, ContentBytes::from_text("ALPHA"))
        .unwrap();

    let (opened_tx, opened_rx) = mpsc::channel();
    let second = thread::spawn({
        let opts = opts.clone();
        move || {
            let session = Session::open(&opts, LockMode::Exclusive).unwrap();
            opened_tx.send(()).unwrap();
            let result = session.market().submit_listing(
                &id("bob"),
                prompt(),
                10,
                ContentBytes::from_text("ALPHA"),
            );
            session.save().unwrap();
            result
        }
    });

    assert!(opened_rx.recv_timeout(Duration::from_millis(300)).is_err());
    first.save().unwrap();
    drop(first);

    opened_rx.recv().unwrap();
    let bob = second.join().unwrap();
    assert!(matches!(bob, Err(MarketError::DuplicateContent)));

    let snapshot = read_snapshot(&opts.state).unwrap();
    assert_eq!(snapshot.listings.len(), 1);
    assert_eq!(snapshot.listings[0].id, alice_listing);
    assert_eq!(snapshot.listings[0].owner, id("alice"));
}

#[test]
fn reader_waits_for_writer_to_save() {
    let dir = tempfile::tempdir().unwrap();
    let opts = options(dir.path());
    let writer = Session::open(&opts, LockMode::Exclusive).unwrap();
    writer.market().deposit(&id("carol"), 40).unwrap();

    let (done_tx, done_rx) = mpsc::channel();
    let reader = thread::spawn({
        let opts = opts.clone();
        move || {
            let session = Session::open(&opts, LockMode::Shared).unwrap();
            done_tx.send(()).unwrap();
            session.market().balance_of(&id("carol"))
        }
    });

    assert!(done_rx.recv_timeout(Duration::from_millis(300)).is_err());
    writer.save().unwrap();
    drop(writer);
    assert_eq!(reader.join().unwrap(), 40);
}
