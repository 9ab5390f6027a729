//! The gateway-facing authority: users, roles, login and token checks.
//!
//! All state sits behind one exclusive lock, so an operation that touches
//! both the identity store and the token table (login, every token check)
//! is never observed half-done.

use super::credential::PasswordDigest;
use super::identity::{IdentityStore, Role, RoleId, User, UserId};
use super::token::{TokenAuthority, TokenValue};
use crate::clock::{Clock, SystemClock};
use crate::config::AuthConfig;
use crate::error::{AuthError, Entity, Result};
use parking_lot::Mutex;
use rand::RngCore;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct ServerState {
    identity: IdentityStore,
    tokens: TokenAuthority,
}

impl ServerState {
    /// Lazily expiring token check against the live user table.
    fn verify(&mut self, token: &str, now: Instant) -> Result<UserId> {
        let Self { identity, tokens } = self;
        tokens.verify(token, now, |user| identity.user(user).is_some())
    }
}

/// Point-in-time counters for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerStats {
    pub users: usize,
    pub roles: usize,
    /// Tokens in the lookup table, including expired ones not yet reclaimed.
    pub tokens: usize,
    pub epochs: usize,
    pub oldest_epoch: Option<u64>,
    pub newest_epoch: Option<u64>,
    pub current_epoch: u64,
}

/// In-memory authentication and authorization server.
pub struct AuthServer {
    config: AuthConfig,
    clock: Arc<dyn Clock>,
    started_on: Instant,
    state: Mutex<ServerState>,
}

impl AuthServer {
    /// Build a server on the system clock and OS random source.
    pub fn new(config: AuthConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: AuthConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        Self::with_rng(config, clock, Box::new(rand::rngs::OsRng))
    }

    /// Build a server with an explicit clock and random source.
    pub fn with_rng(
        config: AuthConfig,
        clock: Arc<dyn Clock>,
        rng: Box<dyn RngCore + Send>,
    ) -> Result<Self> {
        config.validate()?;

        let tokens = TokenAuthority::with_rng(&config, rng);
        let started_on = clock.now();

        tracing::info!(
            token_ttl_secs = config.token_ttl_secs,
            prune_window_secs = config.prune_window_secs,
            "Auth server started"
        );

        Ok(Self {
            config,
            clock,
            started_on,
            state: Mutex::new(ServerState {
                identity: IdentityStore::new(),
                tokens,
            }),
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Time since construction, on the server's clock.
    pub fn uptime(&self) -> Duration {
        self.uptime_at(self.clock.now())
    }

    fn uptime_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_on)
    }

    // ── Users & roles ───────────────────────────────────────────────

    pub fn create_user(&self, name: &str, password: &str) -> Result<UserId> {
        self.state.lock().identity.create_user(name, password)
    }

    /// Delete a user. Their outstanding tokens fail on next use.
    pub fn delete_user(&self, id: UserId) -> Result<()> {
        self.state.lock().identity.delete_user(id)
    }

    pub fn create_role(&self, name: &str) -> Result<RoleId> {
        self.state.lock().identity.create_role(name)
    }

    /// Delete a role. Existing memberships are left in place.
    pub fn delete_role(&self, id: RoleId) -> Result<()> {
        self.state.lock().identity.delete_role(id)
    }

    pub fn add_role_to_user(&self, user: UserId, role: RoleId) -> Result<()> {
        self.state.lock().identity.add_role_to_user(user, role)?;
        Ok(())
    }

    pub fn user(&self, id: UserId) -> Option<User> {
        self.state.lock().identity.user(id).cloned()
    }

    pub fn user_by_name(&self, name: &str) -> Option<User> {
        self.state.lock().identity.user_by_name(name).cloned()
    }

    pub fn role(&self, id: RoleId) -> Option<Role> {
        self.state.lock().identity.role(id).cloned()
    }

    pub fn role_by_name(&self, name: &str) -> Option<Role> {
        self.state.lock().identity.role_by_name(name).cloned()
    }

    // ── Tokens ──────────────────────────────────────────────────────

    /// Check a username/password pair and mint a token for the user.
    ///
    /// Unknown usernames and wrong passwords fail identically. The candidate
    /// digest is computed before the lookup so both paths do the same work.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<TokenValue> {
        let candidate = PasswordDigest::of(password);
        let now = self.clock.now();
        let uptime = self.uptime_at(now);

        let mut state = self.state.lock();
        let user = match state.identity.user_by_name(username) {
            Some(user) if candidate.matches(user.digest()) => user.id,
            _ => {
                tracing::warn!(username = username, "Authentication failed");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let token = state.tokens.issue(user, now, uptime)?;
        Ok(token.value)
    }

    /// Revoke a token. Unknown tokens are ignored.
    pub fn invalidate(&self, token: &str) {
        self.state.lock().tokens.invalidate(token);
    }

    /// Resolve a token to its (live) user.
    pub fn verify(&self, token: &str) -> Result<User> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let user = state.verify(token, now)?;
        state
            .identity
            .user(user)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }

    /// Whether the token's owner holds `role`. The token is checked first;
    /// an unknown or deleted role is `NotFound`.
    pub fn check_role(&self, token: &str, role: RoleId) -> Result<bool> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let user = state.verify(token, now)?;

        let identity = &state.identity;
        if identity.role(role).is_none() {
            return Err(AuthError::NotFound(Entity::Role));
        }
        Ok(identity.user(user).is_some_and(|u| u.has_role(role)))
    }

    /// Every live role held by the token's owner.
    pub fn all_roles(&self, token: &str) -> Result<BTreeSet<RoleId>> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let user = state.verify(token, now)?;

        let identity = &state.identity;
        Ok(identity
            .user(user)
            .map(|u| identity.live_roles(u))
            .unwrap_or_default())
    }

    // ── Diagnostics ─────────────────────────────────────────────────

    /// Tokens physically held in the lookup table.
    pub fn token_count(&self) -> usize {
        self.state.lock().tokens.len()
    }

    pub fn current_epoch(&self) -> u64 {
        let uptime = self.uptime();
        self.state.lock().tokens.pruner().epoch_at(uptime)
    }

    pub fn stats(&self) -> ServerStats {
        let uptime = self.uptime();
        let state = self.state.lock();
        let pruner = state.tokens.pruner();
        ServerStats {
            users: state.identity.user_count(),
            roles: state.identity.role_count(),
            tokens: state.tokens.len(),
            epochs: pruner.bucket_count(),
            oldest_epoch: pruner.oldest_epoch(),
            newest_epoch: pruner.newest_epoch(),
            current_epoch: pruner.epoch_at(uptime),
        }
    }
}
