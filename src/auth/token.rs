// Bearer token hashing

use crate::core::errors::AuthError;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use sha1::Sha1;
use std::fmt;

type HmacSha1 = Hmac<Sha1>;

/// Lookup hash of a bearer token: HMAC-SHA1 as 40 lowercase hex characters
///
/// Identifiers only ever see this hash, never the raw token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenHash(String);

impl TokenHash {
    /// Hash a plaintext token with the given HMAC key
    ///
    /// The key may be empty; tokens issued by older deployments were hashed
    /// with an empty key and still have to resolve.
    pub fn compute(token: &str, key: &[u8]) -> Result<Self, AuthError> {
        let mut mac = HmacSha1::new_from_slice(key)
            .map_err(|e| AuthError::Configuration(format!("Invalid token HMAC key: {}", e)))?;
        mac.update(token.as_bytes());
        Ok(Self(hex::encode(mac.finalize().into_bytes())))
    }

    /// Wrap an already computed hash (40 hex characters)
    pub fn from_hash_string(hash_str: &str) -> Result<Self, String> {
        if hash_str.len() != 40 {
            return Err(format!("Invalid hash length: expected 40, got {}", hash_str.len()));
        }
        if !hash_str.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err("Invalid hash format: must be 40 hex characters".to_string());
        }
        Ok(Self(hash_str.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix safe to put in logs
    pub fn log_prefix(&self) -> &str {
        &self.0[..8]
    }
}

impl fmt::Display for TokenHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bearer token as presented by the client
pub struct AuthToken(Secret<String>);

impl AuthToken {
    pub fn new(token: &str) -> Self {
        Self(Secret::new(token.to_string()))
    }

    pub fn hash(&self, key: &[u8]) -> Result<TokenHash, AuthError> {
        TokenHash::compute(self.0.expose_secret(), key)
    }

    /// Expose the raw token (use with caution)
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("token", &"<REDACTED>")
            .finish()
    }
}
