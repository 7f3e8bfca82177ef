// Identifier capability - resolves identities from credentials and tokens

use crate::auth::token::TokenHash;
use crate::core::errors::AuthError;
use crate::core::models::{Credentials, Identity};
use async_trait::async_trait;

/// Data-access capability used by every authenticator
///
/// `Ok(None)` means "no matching identity". Backend failures are returned as
/// errors and authenticators propagate them unmodified.
#[async_trait]
pub trait Identifier: Send + Sync {
    /// Look up an identity by login credentials (keyed by configured field names)
    async fn find_by_credentials(
        &self,
        credentials: &Credentials,
    ) -> Result<Option<Identity>, AuthError>;

    /// Look up an identity by the hash of a bearer token
    async fn find_by_auth_token(
        &self,
        token_hash: &TokenHash,
    ) -> Result<Option<Identity>, AuthError>;

    /// Look up an identity by the two halves of a remember-token cookie
    async fn find_by_remember_token(
        &self,
        user_id: &str,
        secret: &str,
    ) -> Result<Option<Identity>, AuthError>;
}

/// User attributes a credentials lookup may filter on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupField {
    Id,
    Username,
    Email,
}

impl LookupField {
    /// Map a credentials field name to a user attribute
    pub fn from_field_name(name: &str) -> Result<Self, AuthError> {
        match name {
            "id" => Ok(LookupField::Id),
            "username" => Ok(LookupField::Username),
            "email" => Ok(LookupField::Email),
            other => Err(AuthError::Configuration(format!(
                "Credential field '{}' does not map to a user attribute (expected id, username or email)",
                other
            ))),
        }
    }

    /// Column name in the `users` table
    pub fn column(&self) -> &'static str {
        match self {
            LookupField::Id => "id",
            LookupField::Username => "username",
            LookupField::Email => "email",
        }
    }
}

/// Credentials split into the password and the attribute filters
#[derive(Debug)]
pub struct CredentialQuery<'a> {
    pub password: &'a str,
    pub filters: Vec<(LookupField, &'a str)>,
}

impl<'a> CredentialQuery<'a> {
    /// Split credentials using the configured password field name
    ///
    /// Returns `Ok(None)` when there is no password or nothing to filter on,
    /// so the store answers "no identity" without querying.
    pub fn from_credentials(
        credentials: &'a Credentials,
        password_field: &str,
    ) -> Result<Option<Self>, AuthError> {
        let password = match credentials.get(password_field) {
            Some(p) if !p.is_empty() => p,
            _ => return Ok(None),
        };

        let mut filters = Vec::with_capacity(credentials.len().saturating_sub(1));
        for (field, value) in credentials.iter() {
            if field == password_field {
                continue;
            }
            filters.push((LookupField::from_field_name(field)?, value));
        }

        if filters.is_empty() {
            return Ok(None);
        }

        Ok(Some(Self { password, filters }))
    }
}
