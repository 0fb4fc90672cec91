//! # Identifier Newtypes
//!
//! Newtype wrappers for the marketplace's identifiers. These prevent
//! accidental identifier confusion: a `LicenseId` cannot be passed where a
//! `ListingId` is expected, and a raw string cannot stand in for an
//! authenticated `Identity`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MarketError;

/// Maximum accepted length of an identity string.
pub const MAX_IDENTITY_LEN: usize = 128;

/// Account that receives the platform fee unless configured otherwise.
pub const PLATFORM_TREASURY: &str = "platform-treasury";

/// Listing identifier, assigned monotonically by the listing ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(pub u64);

/// Unique identifier for a license record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicenseId(pub Uuid);

/// An authenticated principal (seller, buyer, or platform account).
///
/// Authentication happens outside this engine; by the time a value reaches
/// the ledger it is trusted to name the caller.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl ListingId {
    /// Access the inner value.
    pub fn get(&self) -> u64 {
        self.0
    }

    /// The id following this one.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl LicenseId {
    /// Generate a new random license identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LicenseId {
    fn default() -> Self {
        Self::new()
    }
}

impl Identity {
    /// Create a validated identity.
    ///
    /// Leading and trailing whitespace is trimmed. The result must be
    /// non-empty, at most [`MAX_IDENTITY_LEN`] bytes, and free of control
    /// characters.
    pub fn new(s: impl Into<String>) -> Result<Self, MarketError> {
        let s = s.into();
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(MarketError::InvalidIdentity("identity must not be empty".into()));
        }
        if trimmed.len() > MAX_IDENTITY_LEN {
            return Err(MarketError::InvalidIdentity(format!(
                "identity exceeds {MAX_IDENTITY_LEN} bytes"
            )));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(MarketError::InvalidIdentity(
                "identity contains control characters".into(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The default platform fee account.
    pub fn treasury() -> Self {
        Self(PLATFORM_TREASURY.to_string())
    }

    /// Return the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Identity {
    type Error = MarketError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        id.0
    }
}

impl std::str::FromStr for Identity {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for ListingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listing:{}", self.0)
    }
}

impl std::fmt::Display for LicenseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "license:{}", self.0)
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
