// Security event logging

use crate::auth::authenticator::StrategyKind;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Authentication event type
///
/// Failures carry no reason: absence, malformed input and lookup misses are
/// deliberately indistinguishable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    AuthSuccess { user_id: i64, strategy: &'static str },
    AuthFailure,
    AuthError,
}

impl AuthEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            AuthEvent::AuthSuccess { .. } => "AUTH_SUCCESS",
            AuthEvent::AuthFailure => "AUTH_FAILURE",
            AuthEvent::AuthError => "AUTH_ERROR",
        }
    }
}

/// Audit logger for authentication outcomes
pub struct AuditLogger {
    db_pool: Option<Arc<PgPool>>,
    strategies: Vec<StrategyKind>,
}

impl AuditLogger {
    /// Create a new audit logger
    ///
    /// If `db_pool` is `None`, only structured logging is used.
    pub fn new(db_pool: Option<Arc<PgPool>>, strategies: Vec<StrategyKind>) -> Self {
        Self { db_pool, strategies }
    }

    /// Log an authentication event
    ///
    /// Fire-and-forget: spawns a task and never blocks or fails the request.
    pub fn log_auth_event(
        &self,
        event: AuthEvent,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) {
        let db_pool = self.db_pool.clone();
        let attempted: Vec<&'static str> = self.strategies.iter().map(|k| k.as_str()).collect();
        let ip = ip_address.map(|s| s.to_string());
        let ua = user_agent.map(|s| s.to_string());

        tokio::spawn(async move {
            match &event {
                AuthEvent::AuthSuccess { user_id, strategy } => {
                    info!(
                        user_id = user_id,
                        strategy = %strategy,
                        ip_address = ?ip,
                        user_agent = ?ua,
                        "Authentication successful"
                    );
                }
                AuthEvent::AuthFailure => {
                    warn!(
                        strategies = ?attempted,
                        ip_address = ?ip,
                        user_agent = ?ua,
                        "Authentication failed"
                    );
                }
                AuthEvent::AuthError => {
                    warn!(
                        strategies = ?attempted,
                        ip_address = ?ip,
                        user_agent = ?ua,
                        "Authentication aborted by backend error"
                    );
                }
            }

            let Some(pool) = db_pool else {
                return;
            };

            let (user_id, strategy) = match &event {
                AuthEvent::AuthSuccess { user_id, strategy } => (Some(*user_id), Some(*strategy)),
                _ => (None, None),
            };

            if let Err(e) = sqlx::query(
                "INSERT INTO auth_audit_log (event_type, user_id, strategy, ip_address, user_agent, created_at)
                 VALUES ($1, $2, $3, $4::inet, $5, NOW())",
            )
            .bind(event.event_type())
            .bind(user_id)
            .bind(strategy)
            .bind(ip.as_deref())
            .bind(ua.as_deref())
            .execute(pool.as_ref())
            .await
            {
                error!(error = %e, "Failed to persist auth audit event");
            }
        });
    }
}
