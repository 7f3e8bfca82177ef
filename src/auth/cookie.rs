// Remember-token cookie authenticator

use crate::auth::authenticator::{Authenticator, StrategyKind, StrategySettings, COOKIE_NAME};
use crate::auth::identifier::Identifier;
use crate::auth::request::AuthRequest;
use crate::core::errors::AuthError;
use crate::core::models::{Identity, RememberToken};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Default remember-token cookie name
pub const DEFAULT_REMEMBER_COOKIE: &str = "remember_token";

/// Verifies a `<userId>|<secret>` remember-token cookie
///
/// Never fails on cookie content: a missing or malformed cookie is simply
/// no identity.
pub struct CookieAuthenticator {
    identifier: Arc<dyn Identifier>,
    cookie_name: String,
}

impl CookieAuthenticator {
    pub fn new(identifier: Arc<dyn Identifier>) -> Self {
        Self::with_cookie_name(identifier, DEFAULT_REMEMBER_COOKIE)
    }

    pub fn with_cookie_name(identifier: Arc<dyn Identifier>, cookie_name: impl Into<String>) -> Self {
        Self {
            identifier,
            cookie_name: cookie_name.into(),
        }
    }

    /// Build from strategy settings (`cookie.name`, optional)
    pub fn from_settings(identifier: Arc<dyn Identifier>, settings: &StrategySettings) -> Self {
        let name = settings.get(COOKIE_NAME).unwrap_or(DEFAULT_REMEMBER_COOKIE);
        Self::with_cookie_name(identifier, name)
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }
}

#[async_trait]
impl Authenticator for CookieAuthenticator {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Cookie
    }

    async fn verify(&self, request: &AuthRequest) -> Result<Option<Identity>, AuthError> {
        let Some(value) = request.cookie(&self.cookie_name) else {
            return Ok(None);
        };

        let Some(token) = RememberToken::parse(&value) else {
            debug!(cookie = %self.cookie_name, "Malformed remember token ignored");
            return Ok(None);
        };

        self.identifier
            .find_by_remember_token(token.user_id(), token.expose_secret())
            .await
    }
}
