//! # Market Configuration
//!
//! Tunables for the ledger. Defaults suit a local marketplace; each field
//! can be overridden from a YAML file (via the CLI) and then from the
//! environment:
//!
//! | Variable                     | Field                   |
//! |------------------------------|-------------------------|
//! | `PMKT_PLATFORM_FEE_BPS`      | `platform_fee_bps`      |
//! | `PMKT_TREASURY`              | `treasury`              |
//! | `PMKT_LICENSE_DURATION_SECS` | `license_duration_secs` |
//! | `PMKT_TOP_UP_AMOUNT`         | `top_up_amount`         |
//! | `PMKT_BLOB_RETRY_ATTEMPTS`   | `blob_retry_attempts`   |
//!
//! A set-but-unparseable variable is an error, never silently ignored.

use serde::{Deserialize, Serialize};

use pmkt_core::{Identity, MarketError};

use crate::model::FeeSplit;

/// Default platform fee: 5%.
pub const DEFAULT_PLATFORM_FEE_BPS: u16 = 500;

/// Default one-time top-up amount in minor units.
pub const DEFAULT_TOP_UP_AMOUNT: u64 = 500_000_000;

/// Default number of attempts per blob store call.
pub const DEFAULT_BLOB_RETRY_ATTEMPTS: u32 = 3;

/// Ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    /// Platform fee in basis points of the purchase price (0..=10000).
    pub platform_fee_bps: u16,
    /// Account credited with the platform fee.
    pub treasury: Identity,
    /// License validity in seconds. `None` grants perpetual licenses.
    pub license_duration_secs: Option<i64>,
    /// Amount credited by the one-time top-up.
    pub top_up_amount: u64,
    /// Attempts per blob store call; transient failures are retried.
    pub blob_retry_attempts: u32,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            platform_fee_bps: DEFAULT_PLATFORM_FEE_BPS,
            treasury: Identity::treasury(),
            license_duration_secs: None,
            top_up_amount: DEFAULT_TOP_UP_AMOUNT,
            blob_retry_attempts: DEFAULT_BLOB_RETRY_ATTEMPTS,
        }
    }
}

impl MarketConfig {
    /// Defaults overridden from the process environment.
    pub fn from_env() -> Result<Self, MarketError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, then validate.
    ///
    /// `lookup` receives the variable names listed in the module docs.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, MarketError> {
        if let Some(v) = lookup("PMKT_PLATFORM_FEE_BPS") {
            self.platform_fee_bps = parse_var("PMKT_PLATFORM_FEE_BPS", &v)?;
        }
        if let Some(v) = lookup("PMKT_TREASURY") {
            self.treasury = Identity::new(v)?;
        }
        if let Some(v) = lookup("PMKT_LICENSE_DURATION_SECS") {
            let v = v.trim();
            self.license_duration_secs = if v.is_empty() || v.eq_ignore_ascii_case("none") {
                None
            } else {
                Some(parse_var("PMKT_LICENSE_DURATION_SECS", v)?)
            };
        }
        if let Some(v) = lookup("PMKT_TOP_UP_AMOUNT") {
            self.top_up_amount = parse_var("PMKT_TOP_UP_AMOUNT", &v)?;
        }
        if let Some(v) = lookup("PMKT_BLOB_RETRY_ATTEMPTS") {
            self.blob_retry_attempts = parse_var("PMKT_BLOB_RETRY_ATTEMPTS", &v)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check field ranges.
    pub fn validate(&self) -> Result<(), MarketError> {
        if self.platform_fee_bps > 10_000 {
            return Err(MarketError::InvalidMetadata(format!(
                "platform_fee_bps {} exceeds 10000",
                self.platform_fee_bps
            )));
        }
        if let Some(secs) = self.license_duration_secs {
            if secs <= 0 {
                return Err(MarketError::InvalidMetadata(format!(
                    "license_duration_secs must be positive, got {secs}"
                )));
            }
        }
        if self.blob_retry_attempts == 0 {
            return Err(MarketError::InvalidMetadata(
                "blob_retry_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Split a price according to the configured platform fee.
    pub fn fee_split(&self, price: u64) -> FeeSplit {
        FeeSplit::compute(price, self.platform_fee_bps)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, MarketError> {
    value
        .trim()
        .parse()
        .map_err(|_| MarketError::InvalidMetadata(format!("{key}: cannot parse {value:?}")))
}
