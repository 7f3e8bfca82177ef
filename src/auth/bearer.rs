// Bearer token authenticator

use crate::auth::authenticator::{Authenticator, StrategyKind, StrategySettings, TOKEN_HMAC_KEY};
use crate::auth::identifier::Identifier;
use crate::auth::request::AuthRequest;
use crate::core::errors::AuthError;
use crate::core::models::Identity;
use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use std::sync::Arc;
use tracing::debug;

/// Verifies `Authorization: Bearer <token>` against hashed tokens
pub struct BearerAuthenticator {
    identifier: Arc<dyn Identifier>,
    hmac_key: Secret<Vec<u8>>,
}

impl BearerAuthenticator {
    /// Create an authenticator hashing tokens with an empty HMAC key
    pub fn new(identifier: Arc<dyn Identifier>) -> Self {
        Self::with_hmac_key(identifier, Vec::new())
    }

    pub fn with_hmac_key(identifier: Arc<dyn Identifier>, hmac_key: Vec<u8>) -> Self {
        Self {
            identifier,
            hmac_key: Secret::new(hmac_key),
        }
    }

    /// Build from strategy settings (`token.hmac_key`, optional)
    pub fn from_settings(identifier: Arc<dyn Identifier>, settings: &StrategySettings) -> Self {
        let key = settings
            .get(TOKEN_HMAC_KEY)
            .map(|k| k.as_bytes().to_vec())
            .unwrap_or_default();
        Self::with_hmac_key(identifier, key)
    }
}

#[async_trait]
impl Authenticator for BearerAuthenticator {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Bearer
    }

    async fn verify(&self, request: &AuthRequest) -> Result<Option<Identity>, AuthError> {
        let Some(token) = request.bearer_token() else {
            return Ok(None);
        };

        let token_hash = token.hash(self.hmac_key.expose_secret())?;
        debug!(token_hash = %token_hash.log_prefix(), "Looking up bearer token");

        self.identifier.find_by_auth_token(&token_hash).await
    }
}
