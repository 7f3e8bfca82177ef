// Domain error types - no internal detail reaches clients

use thiserror::Error;

/// Main error type for authentication and RBAC operations
///
/// Absence of credentials and failed lookups are *not* errors: they are
/// reported as `Ok(None)` by authenticators and identifiers.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Missing or invalid configuration (HTTP 500)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Identifier or store backend failure (HTTP 503)
    #[error("Storage error: {0}")]
    Storage(String),

    /// RBAC entity does not exist (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate RBAC entity (HTTP 409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No strategy produced an identity (HTTP 401)
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Password hashing failure (HTTP 500)
    #[error("Password hash error: {0}")]
    PasswordHash(String),
}

impl AuthError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::Configuration(_) => 500,
            AuthError::Storage(_) => 503,
            AuthError::NotFound(_) => 404,
            AuthError::Conflict(_) => 409,
            AuthError::Unauthenticated => 401,
            AuthError::PasswordHash(_) => 500,
        }
    }

    /// Get user-friendly error message (no sensitive information)
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Configuration(_) => "Internal error".to_string(),
            AuthError::Storage(_) => "Service unavailable".to_string(),
            AuthError::NotFound(what) => format!("Not found: {}", what),
            AuthError::Conflict(what) => format!("Conflict: {}", what),
            AuthError::Unauthenticated => "Unauthenticated".to_string(),
            AuthError::PasswordHash(_) => "Internal error".to_string(),
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Storage(format!("Database error: {}", err))
    }
}
