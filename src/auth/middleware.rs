// Axum authentication middleware

use crate::api::responses::ApiError;
use crate::auth::audit_logger::{AuditLogger, AuthEvent};
use crate::auth::manager::AuthManager;
use crate::auth::request::AuthRequest;
use crate::core::errors::AuthError;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::error;

/// Authentication state containing all dependencies
#[derive(Clone)]
pub struct AuthState {
    pub manager: Arc<AuthManager>,
    pub audit_logger: Arc<AuditLogger>,
    pub body_limit: usize,
}

/// Authentication middleware function
///
/// Buffers the body so the form strategy can read it, runs the configured
/// strategies, and stores the `Authenticated` result in request extensions.
/// Every failed attempt gets the same 401 response.
pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, auth_state.body_limit)
        .await
        .map_err(|_| ApiError::new(StatusCode::BAD_REQUEST, "Invalid request body".to_string()))?;

    let auth_request = AuthRequest::new(parts.headers.clone(), bytes.clone());
    let ip_address = extract_ip_address(&parts.headers);
    let user_agent = extract_user_agent(&parts.headers);

    match auth_state.manager.authenticate(&auth_request).await {
        Ok(Some(authenticated)) => {
            auth_state.audit_logger.log_auth_event(
                AuthEvent::AuthSuccess {
                    user_id: authenticated.identity.id,
                    strategy: authenticated.strategy,
                },
                ip_address.as_deref(),
                user_agent.as_deref(),
            );

            let mut request = Request::from_parts(parts, Body::from(bytes));
            request.extensions_mut().insert(authenticated);
            Ok(next.run(request).await)
        }
        Ok(None) => {
            auth_state.audit_logger.log_auth_event(
                AuthEvent::AuthFailure,
                ip_address.as_deref(),
                user_agent.as_deref(),
            );
            Err(AuthError::Unauthenticated.into())
        }
        Err(e) => {
            error!(error = %e, "Authentication backend failure");
            auth_state.audit_logger.log_auth_event(
                AuthEvent::AuthError,
                ip_address.as_deref(),
                user_agent.as_deref(),
            );
            Err(e.into())
        }
    }
}

/// Extract IP address from request headers
///
/// Checks `X-Forwarded-For` first (first hop only), then `X-Real-IP`. Values
/// that do not parse as an IP address are ignored, since the audit table
/// stores them as `inet`.
fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(parse_ip);

    forwarded.or_else(|| {
        headers
            .get("X-Real-IP")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_ip)
    })
}

fn parse_ip(value: &str) -> Option<String> {
    value.trim().parse::<IpAddr>().ok().map(|ip| ip.to_string())
}

/// Extract user agent from request headers
fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get("User-Agent")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}
