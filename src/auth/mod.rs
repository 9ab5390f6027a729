//! User, role and bearer-token management.
//!
//! Provides:
//! - User and role registry with unique names and never-reused identifiers
//! - Password digests (SHA-256)
//! - Opaque bearer tokens (OS CSPRNG, base64) with a fixed TTL
//! - Epoch-bucketed bulk reclamation of expired tokens
//!
//! ## Design Decisions
//! - Everything is in memory; state is lost on restart.
//! - Stale references are resolved on read rather than cleaned up eagerly:
//!   expired or orphaned tokens are dropped when next verified, and deleted
//!   roles stay in users' membership sets but are skipped by role checks.
//! - Memory held by tokens nobody reads again is reclaimed a whole epoch at a
//!   time, piggybacked on token issuance. There is no background thread.

pub mod credential;
pub mod epoch;
pub mod identity;
pub mod server;
pub mod token;

pub use credential::PasswordDigest;
pub use epoch::{EpochBucket, EpochPruner};
pub use identity::{IdentityStore, Role, RoleId, User, UserId};
pub use server::{AuthServer, ServerStats};
pub use token::{Token, TokenAuthority, TokenValue};
