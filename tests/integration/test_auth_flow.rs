// Integration tests for authentication through the HTTP router

use crate::common::*;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use gatehouse::auth::token::TokenHash;
use gatehouse::auth::user_store::{UserEntry, YamlUserStore};
use gatehouse::core::crypto::hash_password;
use gatehouse::rbac::MemoryRbacStore;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

fn create_app() -> Router {
    let user = UserEntry {
        id: 42,
        username: "ada".to_string(),
        email: Some("ada@example.com".to_string()),
        password_hash: hash_password("correct horse").unwrap(),
        remember_token: Some("rem-secret".to_string()),
        api_token_hashes: vec![TokenHash::compute("api-token-1", b"").unwrap().to_string()],
    };
    let identifier = Arc::new(YamlUserStore::new(vec![user], "password"));
    create_test_router(identifier, Arc::new(MemoryRbacStore::new()))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn me_request() -> axum::http::request::Builder {
    Request::builder().method("GET").uri("/v1/me")
}

#[tokio::test]
async fn test_health_requires_no_auth() {
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(create_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_me_with_bearer_token() {
    let request = me_request()
        .header(header::AUTHORIZATION, "Bearer api-token-1")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(create_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["strategy"], "bearer");
    assert_eq!(body["identity"]["id"], 42);
    assert_eq!(body["identity"]["username"], "ada");
}

#[tokio::test]
async fn test_me_with_remember_cookie() {
    let request = me_request()
        .header(header::COOKIE, "remember_token=42%7Crem-secret")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(create_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["strategy"], "cookie");
    assert_eq!(body["identity"]["email"], "ada@example.com");
}

#[tokio::test]
async fn test_me_with_json_credentials() {
    let request = me_request()
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"username":"ada","password":"correct horse"}"#))
        .unwrap();
    let (status, body) = send(create_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["strategy"], "form");
    assert_eq!(body["identity"]["id"], 42);
}

#[tokio::test]
async fn test_me_with_form_credentials() {
    let request = me_request()
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("username=ada&password=correct+horse"))
        .unwrap();
    let (status, body) = send(create_app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["strategy"], "form");
}

#[tokio::test]
async fn test_failures_are_indistinguishable() {
    let requests = vec![
        me_request().body(Body::empty()).unwrap(),
        me_request()
            .header(header::AUTHORIZATION, "Bearer wrong-token")
            .body(Body::empty())
            .unwrap(),
        me_request()
            .header(header::COOKIE, "remember_token=42|rem-secret|extra")
            .body(Body::empty())
            .unwrap(),
        me_request()
            .header(header::COOKIE, "remember_token=42|wrong")
            .body(Body::empty())
            .unwrap(),
        me_request()
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"username":"ada","password":"battery staple"}"#))
            .unwrap(),
        me_request()
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{broken"))
            .unwrap(),
    ];

    for request in requests {
        let (status, body) = send(create_app(), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, serde_json::json!({"error": "Unauthenticated"}));
    }
}

#[tokio::test]
async fn test_identifier_failure_is_service_unavailable() {
    let app = create_test_router(
        Arc::new(RecordingIdentifier::failing()),
        Arc::new(MemoryRbacStore::new()),
    );
    let request = me_request()
        .header(header::AUTHORIZATION, "Bearer api-token-1")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Service unavailable");
}
