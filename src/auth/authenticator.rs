// Authenticator contract and strategy identifiers

use crate::auth::request::AuthRequest;
use crate::core::errors::AuthError;
use crate::core::models::Identity;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Settings key for the form strategy's username field
pub const FIELDS_USERNAME: &str = "fields.username";
/// Settings key for the form strategy's password field
pub const FIELDS_PASSWORD: &str = "fields.password";
/// Settings key for the cookie strategy's cookie name
pub const COOKIE_NAME: &str = "cookie.name";
/// Settings key for the bearer strategy's HMAC key
pub const TOKEN_HMAC_KEY: &str = "token.hmac_key";

/// A pluggable verification strategy
///
/// Every strategy has the same two outcomes: no credentials presented gives
/// `Ok(None)` without touching the identifier; well-formed credentials give
/// whatever the identifier returns. One attempt per call, no retries.
#[async_trait]
pub trait Authenticator: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn verify(&self, request: &AuthRequest) -> Result<Option<Identity>, AuthError>;
}

/// Identifier of an authenticator strategy, as named in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StrategyKind {
    Bearer,
    Cookie,
    Form,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Bearer => "bearer",
            StrategyKind::Cookie => "cookie",
            StrategyKind::Form => "form",
        }
    }
}

impl FromStr for StrategyKind {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bearer" | "api" => Ok(StrategyKind::Bearer),
            "cookie" | "remember" => Ok(StrategyKind::Cookie),
            "form" | "session" => Ok(StrategyKind::Form),
            other => Err(AuthError::Configuration(format!(
                "Unknown auth strategy '{}': must be one of bearer, cookie, form",
                other
            ))),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-strategy settings map (dotted keys, string values)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategySettings(BTreeMap<String, String>);

impl StrategySettings {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Get a required, non-empty setting
    pub fn require(&self, key: &str) -> Result<&str, AuthError> {
        match self.get(key) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(AuthError::Configuration(format!("{} not set", key))),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StrategySettings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
