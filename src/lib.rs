//! In-process authentication and authorization store.
//!
//! `authcore` keeps users, roles, role assignments and bearer tokens in
//! memory and answers "is this credential valid" and "does this token's
//! owner hold this role". It is meant to sit behind a network gateway that
//! owns transport and maps [`AuthError`] kinds to its own status codes.
//!
//! ```no_run
//! use authcore::{AuthConfig, AuthServer};
//!
//! # fn main() -> authcore::Result<()> {
//! let server = AuthServer::new(AuthConfig::with_ttl(3600))?;
//! let user = server.create_user("elton", "123456")?;
//! let admin = server.create_role("admin")?;
//! server.add_role_to_user(user, admin)?;
//!
//! let token = server.authenticate("elton", "123456")?;
//! assert!(server.check_role(token.as_str(), admin)?);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;

pub use auth::{
    AuthServer, EpochBucket, EpochPruner, IdentityStore, PasswordDigest, Role, RoleId,
    ServerStats, Token, TokenAuthority, TokenValue, User, UserId,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AuthConfig;
pub use error::{AuthError, Entity, Result};
