//! # Filesystem Blob Store
//!
//! Stores each blob as a file under a root directory:
//!
//! ```text
//! <root>/incoming/<uuid>   payload being written (never fetchable)
//! <root>/blobs/<uuid>      published payload, fetched by locator <uuid>
//! ```
//!
//! ## Publication Invariant
//!
//! A payload is written to `incoming/` with `create_new` (so two writers can
//! never share a file), synced, size-checked, and only then renamed into
//! `blobs/`. The rename is atomic on one filesystem, so a reader observes
//! either no blob or the complete blob.
//!
//! ## Locator Validation
//!
//! Locators and write locations are UUIDs issued by this store. Anything
//! else is rejected with `InvalidLocator` before any path is built, which
//! rules out path traversal through a crafted locator.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use uuid::Uuid;

use crate::blob::{BlobLocator, BlobStore, UploadTicket, WriteLocation};
use crate::error::BlobError;

const INCOMING_DIR: &str = "incoming";
const BLOBS_DIR: &str = "blobs";

/// Parse a store-issued identifier, rejecting anything that is not a UUID.
fn parse_blob_id(raw: &str) -> Result<Uuid, BlobError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| BlobError::InvalidLocator(format!("not a blob id: {raw:?}")))
}

/// A blob store backed by a local directory.
#[derive(Debug)]
pub struct FsBlobStore {
    root: PathBuf,
    pending: Mutex<HashMap<WriteLocation, u64>>,
}

impl FsBlobStore {
    /// Create a store rooted at `root`. Directories are created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Return the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path of a published blob.
    pub fn blob_path(&self, locator: &BlobLocator) -> Result<PathBuf, BlobError> {
        let id = parse_blob_id(locator.as_str())?;
        Ok(self.root.join(BLOBS_DIR).join(id.to_string()))
    }
}

impl BlobStore for FsBlobStore {
    fn begin_upload(&self, size: u64, content_type: &str) -> Result<UploadTicket, BlobError> {
        let id = Uuid::new_v4().to_string();
        let write_location = WriteLocation(id.clone());
        self.pending.lock().insert(write_location.clone(), size);
        Ok(UploadTicket {
            write_location,
            retrieval_locator: BlobLocator(id),
            size,
            content_type: content_type.to_string(),
        })
    }

    fn write(&self, location: &WriteLocation, bytes: &[u8]) -> Result<(), BlobError> {
        let id = parse_blob_id(location.as_str())?.to_string();
        let incoming = self.root.join(INCOMING_DIR).join(&id);
        let expected = self
            .pending
            .lock()
            .get(location)
            .copied()
            .ok_or_else(|| BlobError::UnknownUpload(location.to_string()))?;
        let actual = bytes.len() as u64;
        if expected != actual {
            return Err(BlobError::SizeMismatch { expected, actual });
        }

        fs::create_dir_all(self.root.join(INCOMING_DIR))?;
        fs::create_dir_all(self.root.join(BLOBS_DIR))?;

        let written = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&incoming)
            .and_then(|mut f| {
                f.write_all(bytes)?;
                f.sync_all()
            });
        if let Err(e) = written {
            let _ = fs::remove_file(&incoming);
            return Err(e.into());
        }

        let published = self.root.join(BLOBS_DIR).join(&id);
        if let Err(e) = fs::rename(&incoming, &published) {
            let _ = fs::remove_file(&incoming);
            return Err(e.into());
        }

        self.pending.lock().remove(location);
        tracing::debug!(path = %published.display(), size = actual, "blob published");
        Ok(())
    }

    fn fetch(&self, locator: &BlobLocator) -> Result<Vec<u8>, BlobError> {
        let path = self.blob_path(locator)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::Unavailable(format!("no blob at {locator}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn discard(&self, locator: &BlobLocator) -> Result<(), BlobError> {
        let path = self.blob_path(locator)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn cancel_upload(&self, location: &WriteLocation) -> Result<(), BlobError> {
        self.pending.lock().remove(location);
        Ok(())
    }
}
