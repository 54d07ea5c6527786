//! CLI configuration.
//!
//! Defaults come from `DATAMARK_*` environment variables; command-line flags
//! override them.

use anyhow::{bail, Result};
use datamark_core::{EmbeddingParams, SecretKey};

use crate::SchemeArgs;

/// Scheme settings resolved from the environment and flags.
#[derive(Debug, Clone)]
pub struct Config {
    /// Inverse marking density (default: 10)
    pub gamma: u32,
    /// Number of low-order bits eligible for marking (default: 1)
    pub xi: u32,
    /// Fingerprint length in bits (default: 96)
    pub fingerprint_length: usize,
    /// Number of recipients (default: 10)
    pub recipients: u32,
    /// Primary key column name (default: "id")
    pub primary_key: String,
    secret_key: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        let params = EmbeddingParams::default();
        Self {
            gamma: params.gamma,
            xi: params.xi,
            fingerprint_length: params.fingerprint_length,
            recipients: 10,
            primary_key: "id".to_string(),
            secret_key: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let gamma = lookup("DATAMARK_GAMMA")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.gamma);

        let xi = lookup("DATAMARK_XI")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.xi);

        let fingerprint_length = lookup("DATAMARK_FINGERPRINT_LENGTH")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.fingerprint_length);

        let recipients = lookup("DATAMARK_RECIPIENTS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.recipients);

        let primary_key = lookup("DATAMARK_PRIMARY_KEY")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.primary_key);

        let secret_key = lookup("DATAMARK_SECRET_KEY").and_then(|v| v.trim().parse().ok());

        Self {
            gamma,
            xi,
            fingerprint_length,
            recipients,
            primary_key,
            secret_key,
        }
    }

    /// Apply command-line overrides.
    pub fn with_args(mut self, args: &SchemeArgs) -> Self {
        if let Some(gamma) = args.gamma {
            self.gamma = gamma;
        }
        if let Some(xi) = args.xi {
            self.xi = xi;
        }
        if let Some(length) = args.length {
            self.fingerprint_length = length;
        }
        if let Some(recipients) = args.recipients {
            self.recipients = recipients;
        }
        if let Some(key) = args.key {
            self.secret_key = Some(key);
        }
        self
    }

    pub fn params(&self) -> Result<EmbeddingParams> {
        Ok(EmbeddingParams::new(
            self.gamma,
            self.xi,
            self.fingerprint_length,
        )?)
    }

    pub fn secret_key(&self) -> Result<SecretKey> {
        match self.secret_key {
            Some(key) => Ok(SecretKey::new(key)),
            None => bail!("No secret key: pass --key or set DATAMARK_SECRET_KEY"),
        }
    }
}
