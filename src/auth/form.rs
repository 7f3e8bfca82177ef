// Form / JSON credentials authenticator

use crate::auth::authenticator::{
    Authenticator, StrategyKind, StrategySettings, FIELDS_PASSWORD, FIELDS_USERNAME,
};
use crate::auth::identifier::Identifier;
use crate::auth::request::AuthRequest;
use crate::core::errors::AuthError;
use crate::core::models::{Credentials, Identity};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Verifies username/password fields posted as JSON or form-encoded body
///
/// Field names come from the settings map at call time, so one identifier
/// serves login forms that name their fields differently (email vs username).
pub struct FormAuthenticator {
    identifier: Arc<dyn Identifier>,
    settings: StrategySettings,
}

impl FormAuthenticator {
    pub fn new(identifier: Arc<dyn Identifier>, settings: StrategySettings) -> Self {
        Self { identifier, settings }
    }
}

#[async_trait]
impl Authenticator for FormAuthenticator {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Form
    }

    async fn verify(&self, request: &AuthRequest) -> Result<Option<Identity>, AuthError> {
        let username_field = self.settings.require(FIELDS_USERNAME)?;
        let password_field = self.settings.require(FIELDS_PASSWORD)?;

        let mut fields = request.body_fields();
        let username = fields.remove(username_field).filter(|v| !is_falsy(v));
        let password = fields.remove(password_field).filter(|v| !is_falsy(v));

        let (Some(username), Some(password)) = (username, password) else {
            return Ok(None);
        };

        let mut credentials = Credentials::new();
        credentials.insert(username_field, username);
        credentials.insert(password_field, password);

        debug!(
            username_field = %username_field,
            json = request.is_json(),
            "Looking up form credentials"
        );

        self.identifier.find_by_credentials(&credentials).await
    }
}

/// Empty and `"0"` submissions count as absent credentials
fn is_falsy(value: &str) -> bool {
    value.is_empty() || value == "0"
}
