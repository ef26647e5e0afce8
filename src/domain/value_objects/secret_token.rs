//! Cryptographically random secret tokens.
//!
//! Used for vault passwords and freshly minted cluster join tokens.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::rngs::OsRng;
use rand::RngCore;

/// A URL-safe random token.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretToken(String);

impl SecretToken {
    /// Generate a token from `bytes` bytes of OS randomness
    pub fn generate(bytes: usize) -> Self {
        let mut raw = vec![0u8; bytes];
        OsRng.fill_bytes(&mut raw);
        Self(URL_SAFE_NO_PAD.encode(&raw))
    }

    /// Token suitable for a vault password file (32 random bytes)
    pub fn password() -> Self {
        Self::generate(32)
    }

    /// Token suitable for a cluster join secret (24 random bytes)
    pub fn join_token() -> Self {
        Self::generate(24)
    }

    pub fn from_existing(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretToken(***)")
    }
}
