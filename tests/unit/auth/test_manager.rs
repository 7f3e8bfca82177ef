// Unit tests for the strategy registry

use crate::common::*;
use gatehouse::auth::cookie::CookieAuthenticator;
use gatehouse::auth::{AuthManager, StrategyKind};
use gatehouse::config::AuthConfig;
use gatehouse::core::errors::AuthError;
use std::sync::Arc;

#[test]
fn test_from_config_keeps_configured_order() {
    let identifier = Arc::new(RecordingIdentifier::empty());
    let config = AuthConfig {
        strategies: vec![StrategyKind::Form, StrategyKind::Bearer],
        ..AuthConfig::default()
    };

    let manager = AuthManager::from_config(&config, identifier).unwrap();
    assert_eq!(manager.kinds(), vec![StrategyKind::Form, StrategyKind::Bearer]);
    assert!(manager.strategy(StrategyKind::Cookie).is_none());
    assert!(manager.strategy(StrategyKind::Bearer).is_some());
}

#[test]
fn test_from_config_requires_a_strategy() {
    let identifier = Arc::new(RecordingIdentifier::empty());
    let config = AuthConfig {
        strategies: Vec::new(),
        ..AuthConfig::default()
    };

    assert!(matches!(
        AuthManager::from_config(&config, identifier),
        Err(AuthError::Configuration(_))
    ));
}

#[tokio::test]
async fn test_first_matching_strategy_wins() {
    let identifier = Arc::new(RecordingIdentifier::returning(create_test_identity()));
    let manager = AuthManager::from_config(&AuthConfig::default(), identifier.clone()).unwrap();

    let request = create_auth_request(
        &[
            ("authorization", "Bearer token-1"),
            ("cookie", "remember_token=42|abc"),
        ],
        "",
    );
    let authenticated = manager.authenticate(&request).await.unwrap().unwrap();

    assert_eq!(authenticated.strategy, "bearer");
    assert_eq!(authenticated.identity, create_test_identity());
    assert_eq!(identifier.call_count(), 1, "Later strategies are not consulted");
}

#[tokio::test]
async fn test_falls_through_to_later_strategy() {
    let identifier = Arc::new(RecordingIdentifier::returning(create_test_identity()));
    let manager = AuthManager::from_config(&AuthConfig::default(), identifier.clone()).unwrap();

    let request = create_auth_request(
        &[("content-type", "application/x-www-form-urlencoded")],
        "username=ada&password=pw",
    );
    let authenticated = manager.authenticate(&request).await.unwrap().unwrap();

    assert_eq!(authenticated.strategy, "form");
    assert_eq!(identifier.call_count(), 1);
}

#[tokio::test]
async fn test_no_credentials_returns_none() {
    let identifier = Arc::new(RecordingIdentifier::returning(create_test_identity()));
    let manager = AuthManager::from_config(&AuthConfig::default(), identifier.clone()).unwrap();

    let request = create_auth_request(&[], "");
    assert!(manager.authenticate(&request).await.unwrap().is_none());
    assert_eq!(identifier.call_count(), 0);
}

#[tokio::test]
async fn test_strategy_error_aborts_chain() {
    let identifier = Arc::new(RecordingIdentifier::failing());
    let manager = AuthManager::from_config(&AuthConfig::default(), identifier.clone()).unwrap();

    let request = create_auth_request(
        &[
            ("authorization", "Bearer token-1"),
            ("cookie", "remember_token=42|abc"),
        ],
        "",
    );
    assert!(matches!(
        manager.authenticate(&request).await,
        Err(AuthError::Storage(_))
    ));
    assert_eq!(identifier.call_count(), 1);
}

#[tokio::test]
async fn test_register_replaces_same_kind() {
    let identifier = Arc::new(RecordingIdentifier::returning(create_test_identity()));
    let mut manager = AuthManager::from_config(&AuthConfig::default(), identifier.clone()).unwrap();

    manager.register(Arc::new(CookieAuthenticator::with_cookie_name(
        identifier.clone(),
        "keep_me",
    )));
    assert_eq!(
        manager.kinds(),
        vec![StrategyKind::Bearer, StrategyKind::Cookie, StrategyKind::Form]
    );

    let request = create_auth_request(&[("cookie", "keep_me=42|abc")], "");
    let authenticated = manager.authenticate(&request).await.unwrap().unwrap();
    assert_eq!(authenticated.strategy, "cookie");
}
