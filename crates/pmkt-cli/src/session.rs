//! # CLI Session
//!
//! One CLI invocation is one session: load the configuration, restore the
//! ledger from its snapshot file, open the blob directory, run a single
//! marketplace operation, and write the snapshot back if it succeeded.
//!
//! ## Configuration precedence
//!
//! Built-in defaults, then the YAML file passed with `--config`, then the
//! `PMKT_*` environment variables.
//!
//! ## State locking
//!
//! A session holds an advisory lock on `<state>.lock` from `open` until it
//! is dropped. Mutating sessions lock exclusively and read-only sessions
//! share the lock, so two invocations never both load the same snapshot
//! and write back diverging images. A second writer blocks until the
//! first has saved.
//!
//! ## Snapshot writes
//!
//! The snapshot is written to a sibling temporary file, synced, and
//! renamed over the old one, so an interrupted save leaves the previous
//! snapshot intact.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use fs2::FileExt;

use pmkt_core::SystemClock;
use pmkt_crypto::FsBlobStore;
use pmkt_ledger::{LedgerSnapshot, MarketConfig, Marketplace};

/// Paths shared by every subcommand.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Ledger snapshot file. Created on first successful mutation.
    pub state: PathBuf,
    /// Blob directory.
    pub blobs: PathBuf,
    /// Optional YAML configuration file.
    pub config: Option<PathBuf>,
}

/// How a session holds the state lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Read-only access. Any number of shared sessions may be open.
    Shared,
    /// Read-write access. Excludes every other session.
    Exclusive,
}

/// Advisory lock on the `.lock` sibling of a state file. Released on drop.
#[derive(Debug)]
pub struct StateLock {
    _file: File,
    mode: LockMode,
}

impl StateLock {
    /// Block until the lock for `state` is held in `mode`.
    pub fn acquire(state: &Path, mode: LockMode) -> Result<Self> {
        let path = lock_path(state);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("failed to open lock file: {}", path.display()))?;
        let locked = match mode {
            LockMode::Shared => FileExt::lock_shared(&file),
            LockMode::Exclusive => FileExt::lock_exclusive(&file),
        };
        locked.with_context(|| format!("failed to lock {}", path.display()))?;
        tracing::trace!(lock = %path.display(), ?mode, "state lock acquired");
        Ok(Self { _file: file, mode })
    }

    /// The mode this lock is held in.
    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

fn lock_path(state: &Path) -> PathBuf {
    let mut name = state.as_os_str().to_os_string();
    name.push(".lock");
    PathBuf::from(name)
}

/// An opened ledger plus the file it was loaded from.
///
/// The state lock is taken before the snapshot is read and held for the
/// lifetime of the session.
pub struct Session {
    state_path: PathBuf,
    market: Marketplace<FsBlobStore>,
    lock: StateLock,
}

impl Session {
    /// Lock the state file, then load configuration and state.
    pub fn open(opts: &SessionOptions, mode: LockMode) -> Result<Self> {
        let config = load_config(opts.config.as_deref(), |key| std::env::var(key).ok())?;
        let lock = StateLock::acquire(&opts.state, mode)?;
        let snapshot = read_snapshot(&opts.state)?;
        let market = Marketplace::from_snapshot(
            FsBlobStore::new(&opts.blobs),
            config,
            Arc::new(SystemClock),
            snapshot,
        )
        .with_context(|| format!("failed to restore ledger from {}", opts.state.display()))?;
        tracing::debug!(
            state = %opts.state.display(),
            blobs = %opts.blobs.display(),
            ?mode,
            "session opened"
        );
        Ok(Self {
            state_path: opts.state.clone(),
            market,
            lock,
        })
    }

    /// The marketplace.
    pub fn market(&self) -> &Marketplace<FsBlobStore> {
        &self.market
    }

    /// Persist the ledger. Only an exclusive session may save.
    pub fn save(&self) -> Result<()> {
        if self.lock.mode() != LockMode::Exclusive {
            bail!(
                "cannot save {}: session was opened read-only",
                self.state_path.display()
            );
        }
        write_snapshot(&self.state_path, &self.market.snapshot())
    }
}

/// Resolve the configuration from defaults, an optional YAML file, and
/// `lookup` for environment overrides.
pub fn load_config(
    path: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<MarketConfig> {
    let base = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            serde_yaml::from_str::<MarketConfig>(&text)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => MarketConfig::default(),
    };
    base.with_overrides(lookup)
        .context("invalid marketplace configuration")
}

/// Read a snapshot file. A missing file is an empty ledger.
pub fn read_snapshot(path: &Path) -> Result<LedgerSnapshot> {
    if !path.exists() {
        return Ok(LedgerSnapshot::default());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read state: {}", path.display()))?;
    LedgerSnapshot::from_json(&text)
        .with_context(|| format!("failed to parse state: {}", path.display()))
}

/// Atomically replace the snapshot file.
pub fn write_snapshot(path: &Path, snapshot: &LedgerSnapshot) -> Result<()> {
    let json = snapshot.to_json()?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let written = (|| -> std::io::Result<()> {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if let Err(err) = written {
        let _ = fs::remove_file(&tmp);
        return Err(err).with_context(|| format!("failed to write state: {}", path.display()));
    }
    tracing::debug!(state = %path.display(), "snapshot saved");
    Ok(())
}
