// Core data models shared by authenticators, identifiers and the API layer

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Authenticated principal returned by an identifier
///
/// Identities are only ever constructed by identifiers; authenticators pass
/// them through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Credentials extracted from a login request, keyed by the configured field names
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials(BTreeMap<String, String>);

impl Credentials {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Insert a field, replacing any previous value
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for key in self.0.keys() {
            map.entry(key, &"<REDACTED>");
        }
        map.finish()
    }
}

/// Delimiter between user id and secret in the remember-token cookie
pub const REMEMBER_TOKEN_DELIMITER: char = '|';

/// Remember-token cookie value: `<userId>|<secret>`
pub struct RememberToken {
    user_id: String,
    secret: Secret<String>,
}

impl RememberToken {
    /// Parse a cookie value
    ///
    /// Returns `None` unless splitting on `|` yields exactly two segments.
    /// Malformed values are treated as absent, never as errors.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split(REMEMBER_TOKEN_DELIMITER);
        let user_id = parts.next()?;
        let secret = parts.next()?;
        if parts.next().is_some() {
            return None;
        }

        Some(Self {
            user_id: user_id.to_string(),
            secret: Secret::new(secret.to_string()),
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Expose the secret half of the token (use with caution)
    pub fn expose_secret(&self) -> &str {
        self.secret.expose_secret()
    }
}

impl fmt::Debug for RememberToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RememberToken")
            .field("user_id", &self.user_id)
            .field("secret", &"<REDACTED>")
            .finish()
    }
}

/// Timestamp type used by persisted RBAC entities
pub type Timestamp = DateTime<Utc>;
