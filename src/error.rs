//! Error types returned by every fallible authcore operation.
//!
//! Errors are plain values so the embedding gateway can map each kind to its
//! own status codes (401/403/404/409/500 for an HTTP binding). The core never
//! panics on bad input and stays usable after any error.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Which kind of identity entity an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    User,
    Role,
}

impl Entity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Role => "role",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication and authorization errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// A user or role with the requested name already exists.
    #[error("{0} already exists")]
    AlreadyExists(Entity),

    /// No user or role with the given identifier.
    #[error("{0} does not exist")]
    NotFound(Entity),

    /// Password does not satisfy the registration policy.
    #[error("password does not match requirements")]
    WeakCredential,

    /// Unknown username or wrong password. The two cases are not distinguished.
    #[error("authentication failed")]
    InvalidCredentials,

    /// Unknown, expired, revoked or orphaned token.
    #[error("invalid auth token")]
    InvalidToken,

    /// Rejected at construction time.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The random source failed. Not retried by the core.
    #[error("internal server error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;
