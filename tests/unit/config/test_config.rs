// Unit tests for configuration management
// NOTE: These tests must run sequentially to avoid environment variable conflicts

use gatehouse::auth::StrategyKind;
use gatehouse::config::Config;
use gatehouse::core::errors::AuthError;
use std::env;
use std::fs;
use std::sync::Mutex;
use tempfile::TempDir;

// Global mutex to serialize environment variable access in tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

const VARS: &[&str] = &[
    "BIND_ADDRESS",
    "PORT",
    "DATABASE_URL",
    "USERS_YAML_PATH",
    "RBAC_YAML_PATH",
    "AUTH_STRATEGIES",
    "AUTH_FORM_USERNAME_FIELD",
    "AUTH_FORM_PASSWORD_FIELD",
    "AUTH_REMEMBER_COOKIE",
    "AUTH_TOKEN_HMAC_KEY",
    "REQUEST_TIMEOUT_SECS",
    "BODY_SIZE_LIMIT_BYTES",
    "LOG_LEVEL",
    "LOG_FORMAT",
];

fn clear_env_vars() {
    for var in VARS {
        env::remove_var(var);
    }
}

fn lock_env() -> std::sync::MutexGuard<'static, ()> {
    let guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    clear_env_vars();
    guard
}

#[test]
fn test_config_default_values() {
    let _guard = lock_env();

    let config = Config::from_env().unwrap();
    assert_eq!(config.bind_address, "0.0.0.0");
    assert_eq!(config.port, 8000);
    assert!(config.database_url.is_none());
    assert!(config.users_yaml_path.is_none());
    assert_eq!(
        config.auth.strategies,
        vec![StrategyKind::Bearer, StrategyKind::Cookie, StrategyKind::Form]
    );
    assert_eq!(config.auth.username_field, "username");
    assert_eq!(config.auth.password_field, "password");
    assert_eq!(config.auth.remember_cookie, "remember_token");
    assert_eq!(config.auth.token_hmac_key, "");
    assert_eq!(config.request_timeout_secs, 30);
    assert_eq!(config.body_size_limit_bytes, 1024 * 1024);
    assert_eq!(config.log_level, "info");
    assert_eq!(config.log_format, "json");
}

#[test]
fn test_config_custom_values() {
    let _guard = lock_env();
    let temp_dir = TempDir::new().unwrap();
    let users = temp_dir.path().join("users.yaml");
    fs::write(&users, "users: []").unwrap();

    env::set_var("PORT", "9090");
    env::set_var("USERS_YAML_PATH", &users);
    env::set_var("AUTH_STRATEGIES", "session, api");
    env::set_var("AUTH_FORM_USERNAME_FIELD", "email");
    env::set_var("AUTH_TOKEN_HMAC_KEY", "pepper");
    env::set_var("LOG_FORMAT", "text");

    let config = Config::from_env();
    clear_env_vars();
    let config = config.unwrap();

    assert_eq!(config.port, 9090);
    assert_eq!(config.users_yaml_path.as_deref(), Some(users.as_path()));
    assert_eq!(config.auth.strategies, vec![StrategyKind::Form, StrategyKind::Bearer]);
    assert_eq!(config.auth.username_field, "email");
    assert_eq!(config.auth.token_hmac_key, "pepper");
    assert_eq!(config.log_format, "text");
}

#[test]
fn test_config_invalid_values() {
    let _guard = lock_env();

    let cases = [
        ("PORT", "not-a-port"),
        ("PORT", "0"),
        ("AUTH_STRATEGIES", "bearer,oauth"),
        ("REQUEST_TIMEOUT_SECS", "0"),
        ("BODY_SIZE_LIMIT_BYTES", "lots"),
        ("LOG_LEVEL", "verbose"),
        ("LOG_FORMAT", "xml"),
        ("DATABASE_URL", "not a url"),
        ("USERS_YAML_PATH", "/definitely/missing/users.yaml"),
    ];

    for (key, value) in cases {
        clear_env_vars();
        env::set_var(key, value);
        let result = Config::from_env();
        assert!(
            matches!(result, Err(AuthError::Configuration(_))),
            "{}={} should be rejected",
            key,
            value
        );
    }
    clear_env_vars();
}

#[test]
fn test_form_fields_must_differ() {
    let _guard = lock_env();

    env::set_var("AUTH_FORM_USERNAME_FIELD", "password");
    let result = Config::from_env();
    clear_env_vars();
    assert!(matches!(result, Err(AuthError::Configuration(_))));
}

#[test]
fn test_username_field_must_map_to_user_attribute() {
    let _guard = lock_env();

    env::set_var("AUTH_FORM_USERNAME_FIELD", "login");
    let result = Config::from_env();
    assert!(matches!(result, Err(AuthError::Configuration(_))));

    // Only checked when the form strategy is enabled
    env::set_var("AUTH_STRATEGIES", "bearer,cookie");
    let result = Config::from_env();
    clear_env_vars();
    assert!(result.is_ok());
}
