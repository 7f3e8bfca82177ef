// Strategy registry - tries configured authenticators in order

use crate::auth::authenticator::{Authenticator, StrategyKind, StrategySettings};
use crate::auth::bearer::BearerAuthenticator;
use crate::auth::cookie::CookieAuthenticator;
use crate::auth::form::FormAuthenticator;
use crate::auth::identifier::Identifier;
use crate::auth::request::AuthRequest;
use crate::config::AuthConfig;
use crate::core::errors::AuthError;
use crate::core::models::Identity;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Successful authentication: the identity and the strategy that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Authenticated {
    pub identity: Identity,
    pub strategy: &'static str,
}

/// Ordered registry of authenticator strategies keyed by `StrategyKind`
#[derive(Default, Clone)]
pub struct AuthManager {
    strategies: Vec<Arc<dyn Authenticator>>,
}

impl AuthManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every configured strategy, in configured order, over one identifier
    pub fn from_config(config: &AuthConfig, identifier: Arc<dyn Identifier>) -> Result<Self, AuthError> {
        if config.strategies.is_empty() {
            return Err(AuthError::Configuration(
                "At least one auth strategy must be configured".to_string(),
            ));
        }

        let mut manager = Self::new();
        for kind in &config.strategies {
            let settings = config.strategy_settings(*kind);
            manager.register(build_strategy(*kind, identifier.clone(), &settings));
        }
        Ok(manager)
    }

    /// Register a strategy, replacing any existing one of the same kind in place
    pub fn register(&mut self, authenticator: Arc<dyn Authenticator>) {
        let kind = authenticator.kind();
        match self.strategies.iter().position(|s| s.kind() == kind) {
            Some(index) => self.strategies[index] = authenticator,
            None => self.strategies.push(authenticator),
        }
    }

    pub fn strategy(&self, kind: StrategyKind) -> Option<Arc<dyn Authenticator>> {
        self.strategies.iter().find(|s| s.kind() == kind).cloned()
    }

    pub fn kinds(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    /// Try each strategy in order; the first identity wins
    ///
    /// A strategy error aborts the chain and propagates: a broken identifier
    /// must not be masked by a later strategy reporting "no identity".
    pub async fn authenticate(&self, request: &AuthRequest) -> Result<Option<Authenticated>, AuthError> {
        for strategy in &self.strategies {
            if let Some(identity) = strategy.verify(request).await? {
                debug!(strategy = %strategy.kind(), user_id = identity.id, "Strategy produced identity");
                return Ok(Some(Authenticated {
                    identity,
                    strategy: strategy.kind().as_str(),
                }));
            }
        }
        Ok(None)
    }
}

/// Construct one strategy from its settings map
pub fn build_strategy(
    kind: StrategyKind,
    identifier: Arc<dyn Identifier>,
    settings: &StrategySettings,
) -> Arc<dyn Authenticator> {
    match kind {
        StrategyKind::Bearer => Arc::new(BearerAuthenticator::from_settings(identifier, settings)),
        StrategyKind::Cookie => Arc::new(CookieAuthenticator::from_settings(identifier, settings)),
        StrategyKind::Form => Arc::new(FormAuthenticator::new(identifier, settings.clone())),
    }
}
