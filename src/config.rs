// Configuration management

use crate::auth::authenticator::{
    StrategyKind, StrategySettings, COOKIE_NAME, FIELDS_PASSWORD, FIELDS_USERNAME, TOKEN_HMAC_KEY,
};
use crate::auth::cookie::DEFAULT_REMEMBER_COOKIE;
use crate::auth::identifier::LookupField;
use crate::core::errors::AuthError;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

/// Application configuration loaded from environment variables
///
/// Supports both database-backed and YAML-based operation modes.
/// All configuration is validated on load with clear error messages.
#[derive(Debug, Clone)]
pub struct Config {
    // Server configuration
    pub bind_address: String,
    pub port: u16,

    // Storage configuration (database, or YAML files when no database)
    pub database_url: Option<String>,
    pub users_yaml_path: Option<PathBuf>,
    pub rbac_yaml_path: Option<PathBuf>,

    // Authentication strategies
    pub auth: AuthConfig,

    // Middleware configuration
    pub request_timeout_secs: u64,
    pub body_size_limit_bytes: usize,

    // Logging configuration
    pub log_level: String,
    pub log_format: String, // "json" or "text"
}

/// Authenticator strategy configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// Strategies tried in this order
    pub strategies: Vec<StrategyKind>,
    pub username_field: String,
    pub password_field: String,
    pub remember_cookie: String,
    /// HMAC key for bearer token hashes; empty keeps compatibility with
    /// tokens hashed without a key
    pub token_hmac_key: String,
}

impl AuthConfig {
    /// Settings map handed to one strategy
    pub fn strategy_settings(&self, kind: StrategyKind) -> StrategySettings {
        match kind {
            StrategyKind::Bearer => {
                StrategySettings::new().with(TOKEN_HMAC_KEY, self.token_hmac_key.as_str())
            }
            StrategyKind::Cookie => {
                StrategySettings::new().with(COOKIE_NAME, self.remember_cookie.as_str())
            }
            StrategyKind::Form => StrategySettings::new()
                .with(FIELDS_USERNAME, self.username_field.as_str())
                .with(FIELDS_PASSWORD, self.password_field.as_str()),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            strategies: vec![StrategyKind::Bearer, StrategyKind::Cookie, StrategyKind::Form],
            username_field: "username".to_string(),
            password_field: "password".to_string(),
            remember_cookie: DEFAULT_REMEMBER_COOKIE.to_string(),
            token_hmac_key: String::new(),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("strategies", &self.strategies)
            .field("username_field", &self.username_field)
            .field("password_field", &self.password_field)
            .field("remember_cookie", &self.remember_cookie)
            .field("token_hmac_key", &"<REDACTED>")
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Supports `.env` file loading in development (via dotenv crate).
    pub fn from_env() -> Result<Self, AuthError> {
        // Skip in test environment to avoid interfering with test environment variables
        #[cfg(not(test))]
        {
            dotenv::dotenv().ok();
        }

        let auth = AuthConfig {
            strategies: Self::parse_strategies(&Self::get_env_or_default(
                "AUTH_STRATEGIES",
                "bearer,cookie,form",
            ))?,
            username_field: Self::get_env_or_default("AUTH_FORM_USERNAME_FIELD", "username"),
            password_field: Self::get_env_or_default("AUTH_FORM_PASSWORD_FIELD", "password"),
            remember_cookie: Self::get_env_or_default("AUTH_REMEMBER_COOKIE", DEFAULT_REMEMBER_COOKIE),
            token_hmac_key: env::var("AUTH_TOKEN_HMAC_KEY").unwrap_or_default(),
        };

        let config = Self {
            bind_address: Self::get_env_or_default("BIND_ADDRESS", "0.0.0.0"),
            port: Self::parse_port()?,
            database_url: Self::get_optional_env("DATABASE_URL"),
            users_yaml_path: Self::get_optional_env("USERS_YAML_PATH").map(PathBuf::from),
            rbac_yaml_path: Self::get_optional_env("RBAC_YAML_PATH").map(PathBuf::from),
            auth,
            request_timeout_secs: Self::parse_u64_or_default("REQUEST_TIMEOUT_SECS", 30)?,
            body_size_limit_bytes: Self::parse_usize_or_default("BODY_SIZE_LIMIT_BYTES", 1024 * 1024)?,
            log_level: Self::get_env_or_default("LOG_LEVEL", "info"),
            log_format: Self::get_env_or_default("LOG_FORMAT", "json"),
        };

        config.validate()?;

        Ok(config)
    }

    fn get_env_or_default(key: &str, default: &str) -> String {
        match env::var(key) {
            Ok(value) if !value.is_empty() => value,
            _ => default.to_string(),
        }
    }

    fn get_optional_env(key: &str) -> Option<String> {
        match env::var(key) {
            Ok(value) if !value.is_empty() => Some(value),
            _ => None,
        }
    }

    fn parse_port() -> Result<u16, AuthError> {
        let port_str = env::var("PORT").unwrap_or_else(|_| "8000".to_string());
        let port = port_str.parse::<u16>().map_err(|e| {
            AuthError::Configuration(format!("Invalid PORT value '{}': {}", port_str, e))
        })?;

        if port == 0 {
            return Err(AuthError::Configuration(
                "PORT must be between 1 and 65535".to_string(),
            ));
        }

        Ok(port)
    }

    fn parse_u64_or_default(key: &str, default: u64) -> Result<u64, AuthError> {
        match env::var(key) {
            Ok(value) => {
                let parsed = value.parse::<u64>().map_err(|e| {
                    AuthError::Configuration(format!("Invalid {} value '{}': {}", key, value, e))
                })?;
                if parsed == 0 {
                    return Err(AuthError::Configuration(format!("{} must be greater than 0", key)));
                }
                Ok(parsed)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_usize_or_default(key: &str, default: usize) -> Result<usize, AuthError> {
        match env::var(key) {
            Ok(value) => {
                let parsed = value.parse::<usize>().map_err(|e| {
                    AuthError::Configuration(format!("Invalid {} value '{}': {}", key, value, e))
                })?;
                if parsed == 0 {
                    return Err(AuthError::Configuration(format!("{} must be greater than 0", key)));
                }
                Ok(parsed)
            }
            Err(_) => Ok(default),
        }
    }

    /// Parse a comma-separated, ordered strategy list; duplicates are dropped
    pub fn parse_strategies(value: &str) -> Result<Vec<StrategyKind>, AuthError> {
        let mut strategies = Vec::new();
        for name in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let kind: StrategyKind = name.parse()?;
            if !strategies.contains(&kind) {
                strategies.push(kind);
            }
        }

        if strategies.is_empty() {
            return Err(AuthError::Configuration(
                "AUTH_STRATEGIES must name at least one strategy".to_string(),
            ));
        }
        Ok(strategies)
    }

    /// Validate configuration after loading
    fn validate(&self) -> Result<(), AuthError> {
        if let Some(ref url) = self.database_url {
            Self::validate_url(url, "Database")?;
        }
        if let Some(ref path) = self.users_yaml_path {
            Self::validate_file_path(path, "USERS_YAML_PATH")?;
        }
        if let Some(ref path) = self.rbac_yaml_path {
            Self::validate_file_path(path, "RBAC_YAML_PATH")?;
        }

        if self.auth.username_field == self.auth.password_field {
            return Err(AuthError::Configuration(
                "AUTH_FORM_USERNAME_FIELD and AUTH_FORM_PASSWORD_FIELD must differ".to_string(),
            ));
        }
        if self.auth.strategies.contains(&StrategyKind::Form) {
            LookupField::from_field_name(&self.auth.username_field)?;
        }

        Self::validate_log_level(&self.log_level)?;
        Self::validate_log_format(&self.log_format)?;
        Ok(())
    }

    fn validate_file_path(path: &Path, description: &str) -> Result<(), AuthError> {
        if !path.is_file() {
            return Err(AuthError::Configuration(format!(
                "{} does not point to a readable file: {:?}",
                description, path
            )));
        }
        Ok(())
    }

    fn validate_url(url: &str, description: &str) -> Result<(), AuthError> {
        url::Url::parse(url).map_err(|e| {
            AuthError::Configuration(format!("Invalid {} URL '{}': {}", description, url, e))
        })?;
        Ok(())
    }

    fn validate_log_level(level: &str) -> Result<(), AuthError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&level.to_lowercase().as_str()) {
            return Err(AuthError::Configuration(format!(
                "Invalid LOG_LEVEL '{}': must be one of {}",
                level,
                valid_levels.join(", ")
            )));
        }
        Ok(())
    }

    fn validate_log_format(format: &str) -> Result<(), AuthError> {
        if format != "json" && format != "text" {
            return Err(AuthError::Configuration(format!(
                "Invalid LOG_FORMAT '{}': must be 'json' or 'text'",
                format
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Create a test configuration
    ///
    /// Bypasses environment loading and file validation.
    pub fn test_config() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8000,
            database_url: None,
            users_yaml_path: None,
            rbac_yaml_path: None,
            auth: AuthConfig::default(),
            request_timeout_secs: 30,
            body_size_limit_bytes: 1024 * 1024,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}
