//! Construction-time configuration for [`AuthServer`](crate::AuthServer).
//!
//! Values are validated once, when the server is built. A running server owns
//! its own copy, so later edits to the caller's config have no effect.

use crate::error::{AuthError, Result};
use anyhow::Context;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Shortest token lifetime accepted (seconds).
pub const MIN_TOKEN_TTL_SECS: u64 = 60;

/// Longest token lifetime accepted (seconds): 365 days.
pub const MAX_TOKEN_TTL_SECS: u64 = 365 * 24 * 3600;

/// Default token lifetime: 1 hour.
const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

/// Default epoch width: 1 hour.
const DEFAULT_PRUNE_WINDOW_SECS: u64 = 3600;

/// Random bytes per token (8 bytes = 12 base64 chars).
const DEFAULT_TOKEN_BYTES: usize = 8;

const MIN_TOKEN_BYTES: usize = 8;
const MAX_TOKEN_BYTES: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Lifetime of an issued token in seconds (60..=31536000).
    pub token_ttl_secs: u64,
    /// Width of one pruning epoch in seconds. Must be positive.
    pub prune_window_secs: u64,
    /// Random bytes drawn per token before base64 encoding (8..=64).
    pub token_bytes: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            prune_window_secs: DEFAULT_PRUNE_WINDOW_SECS,
            token_bytes: DEFAULT_TOKEN_BYTES,
        }
    }
}

impl AuthConfig {
    /// Config with the given token lifetime and every other field defaulted.
    pub fn with_ttl(token_ttl_secs: u64) -> Self {
        Self {
            token_ttl_secs,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.token_ttl_secs < MIN_TOKEN_TTL_SECS {
            return Err(AuthError::InvalidConfiguration(format!(
                "token_ttl_secs must be at least {MIN_TOKEN_TTL_SECS}, got {}",
                self.token_ttl_secs
            )));
        }
        if self.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(AuthError::InvalidConfiguration(format!(
                "token_ttl_secs must be at most {MAX_TOKEN_TTL_SECS}, got {}",
                self.token_ttl_secs
            )));
        }
        if self.prune_window_secs == 0 {
            return Err(AuthError::InvalidConfiguration(
                "prune_window_secs must be positive".into(),
            ));
        }
        if !(MIN_TOKEN_BYTES..=MAX_TOKEN_BYTES).contains(&self.token_bytes) {
            return Err(AuthError::InvalidConfiguration(format!(
                "token_bytes must be within {MIN_TOKEN_BYTES}..={MAX_TOKEN_BYTES}, got {}",
                self.token_bytes
            )));
        }
        Ok(())
    }

    /// Parse a TOML document and validate the result.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| AuthError::InvalidConfiguration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML config file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read auth config {}", path.display()))?;
        let config = Self::from_toml_str(&raw)
            .with_context(|| format!("Failed to parse auth config {}", path.display()))?;
        Ok(config)
    }

    /// JSON Schema of the config, for gateway-side config export.
    pub fn json_schema() -> serde_json::Value {
        let schema = schemars::schema_for!(AuthConfig);
        serde_json::to_value(&schema).unwrap_or_default()
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    pub fn prune_window(&self) -> Duration {
        Duration::from_secs(self.prune_window_secs)
    }
}
