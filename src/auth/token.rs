//! Bearer token issuance and verification.
//!
//! Tokens are random bytes from the OS CSPRNG, base64-encoded, bound to a
//! user id and an absolute expiry instant. The lookup table is the only
//! owner; the [`EpochPruner`] holds a shared reference to each value so whole
//! epochs can be dropped in bulk.
//!
//! Stale entries are removed lazily: an expired token, or one whose user has
//! been deleted, is dropped from the table when it is next verified.
//!
//! A value is unique among live tokens only. A revoked or expired value may
//! be drawn again while an old bucket still references it, so eviction
//! removes a table entry only if it is the very allocation the bucket
//! recorded.

use super::epoch::{EpochBucket, EpochPruner};
use super::identity::UserId;
use crate::config::AuthConfig;
use crate::error::{AuthError, Result};
use base64::Engine;
use rand::RngCore;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Fresh draws attempted before giving up on a unique value.
const MAX_DRAW_ATTEMPTS: usize = 8;

/// Opaque token value. Cheap to clone; clones share one allocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenValue(Arc<str>);

impl TokenValue {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Same issuance, not just the same text.
    fn same_issuance(&self, other: &TokenValue) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Borrow<str> for TokenValue {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TokenValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TokenValue {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for TokenValue {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

/// An issued token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub value: TokenValue,
    pub user: UserId,
    pub expires_at: Instant,
}

/// Token lookup table plus its epoch pruner.
pub struct TokenAuthority {
    ttl: Duration,
    token_bytes: usize,
    rng: Box<dyn RngCore + Send>,
    tokens: HashMap<TokenValue, Token>,
    pruner: EpochPruner,
}

impl fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuthority")
            .field("ttl", &self.ttl)
            .field("token_bytes", &self.token_bytes)
            .field("tokens", &self.tokens.len())
            .field("pruner", &self.pruner)
            .finish()
    }
}

impl TokenAuthority {
    /// Authority drawing token bytes from the OS random source.
    pub fn new(config: &AuthConfig) -> Self {
        Self::with_rng(config, Box::new(rand::rngs::OsRng))
    }

    /// Authority with a caller-supplied random source.
    pub fn with_rng(config: &AuthConfig, rng: Box<dyn RngCore + Send>) -> Self {
        Self {
            ttl: config.token_ttl(),
            token_bytes: config.token_bytes,
            rng,
            tokens: HashMap::new(),
            pruner: EpochPruner::new(config.prune_window(), config.token_ttl()),
        }
    }

    /// Mint a token for `user`, expiring one TTL after `now`. `uptime` places
    /// it in its epoch; crossing into a new epoch may evict old buckets.
    pub fn issue(&mut self, user: UserId, now: Instant, uptime: Duration) -> Result<Token> {
        let expires_at = now
            .checked_add(self.ttl)
            .ok_or_else(|| AuthError::Internal("token expiry overflows the clock".into()))?;
        let value = self.draw_unique()?;
        let token = Token {
            value: value.clone(),
            user,
            expires_at,
        };
        self.tokens.insert(value.clone(), token.clone());

        let evicted = self.pruner.record(value, uptime);
        if !evicted.is_empty() {
            self.reclaim(&evicted);
        }

        tracing::debug!(
            user_id = user.0,
            epoch = self.pruner.newest_epoch().unwrap_or_default(),
            "Token issued"
        );
        Ok(token)
    }

    /// Resolve a token to its user id. Expired tokens and tokens whose user
    /// is gone (per `user_alive`) are removed and reported as invalid.
    pub fn verify(
        &mut self,
        value: &str,
        now: Instant,
        user_alive: impl FnOnce(UserId) -> bool,
    ) -> Result<UserId> {
        let (user, expires_at) = match self.tokens.get(value) {
            Some(token) => (token.user, token.expires_at),
            None => return Err(AuthError::InvalidToken),
        };

        if now > expires_at {
            self.tokens.remove(value);
            tracing::debug!(user_id = user.0, "Expired token dropped on read");
            return Err(AuthError::InvalidToken);
        }

        if !user_alive(user) {
            self.tokens.remove(value);
            tracing::debug!(user_id = user.0, "Orphaned token dropped on read");
            return Err(AuthError::InvalidToken);
        }

        Ok(user)
    }

    /// Revoke a token. Returns whether it was present. The epoch bucket keeps
    /// its reference until the bucket itself is evicted.
    pub fn invalidate(&mut self, value: &str) -> bool {
        let removed = self.tokens.remove(value).is_some();
        if removed {
            tracing::debug!("Token invalidated");
        }
        removed
    }

    pub fn get(&self, value: &str) -> Option<&Token> {
        self.tokens.get(value)
    }

    /// Tokens physically present in the lookup table, stale ones included.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn pruner(&self) -> &EpochPruner {
        &self.pruner
    }

    fn draw_unique(&mut self) -> Result<TokenValue> {
        let mut bytes = vec![0u8; self.token_bytes];
        for _ in 0..MAX_DRAW_ATTEMPTS {
            self.rng.try_fill_bytes(&mut bytes).map_err(|e| {
                tracing::warn!("Random source failed while minting token: {e}");
                AuthError::Internal(format!("random source failed: {e}"))
            })?;
            let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
            if !self.tokens.contains_key(encoded.as_str()) {
                return Ok(TokenValue::from(encoded));
            }
        }
        tracing::warn!(
            attempts = MAX_DRAW_ATTEMPTS,
            "Random source keeps producing live token values"
        );
        Err(AuthError::Internal(
            "could not draw a unique token value".into(),
        ))
    }

    fn reclaim(&mut self, evicted: &[EpochBucket]) {
        let mut removed = 0usize;
        for bucket in evicted {
            for value in bucket.tokens() {
                let recorded = self
                    .tokens
                    .get_key_value(value.as_str())
                    .is_some_and(|(live, _)| live.same_issuance(value));
                if recorded {
                    self.tokens.remove(value.as_str());
                    removed += 1;
                }
            }
        }
        tracing::info!(
            buckets = evicted.len(),
            tokens = removed,
            oldest_remaining = self.pruner.oldest_epoch().unwrap_or_default(),
            "Evicted expired token epochs"
        );
    }
}
