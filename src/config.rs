//! Configuration (spec.md §3 lifecycle, SPEC_FULL.md §12).
//!
//! Grounded on the teacher's `config.rs::load_config()`: `dotenv().ok()`
//! followed by `std::env::var(...)`, failing fast on the first missing
//! required value.

use std::time::Duration;

use crate::error::{Error, Result};

/// Default TTL for the balance/positions caches (spec.md §3: 15 seconds).
pub const DEFAULT_ACCOUNT_TTL: Duration = Duration::from_secs(15);

/// Credentials and runtime settings for one `OkxClient` instance.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub api_secret: String,
    pub passphrase: String,
    /// Informational only (spec.md §9 open question): the base URL is never
    /// switched by this flag. It does set OKX's `x-simulated-trading` header.
    pub testnet: bool,
    pub account_ttl: Duration,
}

impl ClientConfig {
    /// Construct directly, validating that no credential is empty
    /// (spec.md §3 Lifecycle: "construction fails otherwise").
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        passphrase: impl Into<String>,
        testnet: bool,
    ) -> Result<Self> {
        let config = Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            passphrase: passphrase.into(),
            testnet,
            account_ttl: DEFAULT_ACCOUNT_TTL,
        };
        config.validate()?;
        Ok(config)
    }

    /// Override the account-state cache TTL (tests use a short TTL).
    pub fn with_account_ttl(mut self, ttl: Duration) -> Self {
        self.account_ttl = ttl;
        self
    }

    /// Load credentials from `OKX_API_KEY`, `OKX_API_SECRET`,
    /// `OKX_PASSPHRASE`, and optional `OKX_TESTNET` (default `false`),
    /// reading a `.env` file first if present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let api_key = std::env::var("OKX_API_KEY")
            .map_err(|_| Error::Configuration("OKX_API_KEY not set".into()))?;
        let api_secret = std::env::var("OKX_API_SECRET")
            .map_err(|_| Error::Configuration("OKX_API_SECRET not set".into()))?;
        let passphrase = std::env::var("OKX_PASSPHRASE")
            .map_err(|_| Error::Configuration("OKX_PASSPHRASE not set".into()))?;
        let testnet = std::env::var("OKX_TESTNET")
            .ok()
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self::new(api_key, api_secret, passphrase, testnet)
    }

    fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() || self.api_secret.is_empty() || self.passphrase.is_empty() {
            return Err(Error::Configuration(
                "api_key, api_secret, and passphrase must all be non-empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_credentials() {
        assert!(ClientConfig::new("", "secret", "pass", false).is_err());
        assert!(ClientConfig::new("key", "", "pass", false).is_err());
        assert!(ClientConfig::new("key", "secret", "", false).is_err());
    }

    #[test]
    fn accepts_non_empty_credentials() {
        assert!(ClientConfig::new("key", "secret", "pass", false).is_ok());
    }
}
