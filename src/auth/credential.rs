//! Password digests.
//!
//! Passwords are reduced to a SHA-256 digest on registration and every
//! login attempt is digested the same way before comparison. Only the digest
//! is ever stored.

use sha2::{Digest, Sha256};
use std::fmt;

/// Digest length in bytes (SHA-256).
pub const DIGEST_LEN: usize = 32;

/// One-way digest of a password.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordDigest([u8; DIGEST_LEN]);

impl PasswordDigest {
    /// Digest a plaintext password. Same input, same output.
    pub fn of(password: &str) -> Self {
        let mut h = Sha256::new();
        h.update(password.as_bytes());
        let mut out = [0u8; DIGEST_LEN];
        out.copy_from_slice(&h.finalize());
        Self(out)
    }

    /// Compare against a stored digest in time independent of where the
    /// bytes first differ.
    pub fn matches(&self, stored: &PasswordDigest) -> bool {
        let diff = self
            .0
            .iter()
            .zip(stored.0.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b));
        diff == 0
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

// Only a short prefix, so digests don't end up whole in logs.
impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PasswordDigest({}…)", hex::encode(&self.0[..4]))
    }
}
