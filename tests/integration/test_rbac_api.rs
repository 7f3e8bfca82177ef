// Integration tests for role/permission endpoints

use crate::common::*;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use gatehouse::rbac::{MemoryRbacStore, RbacStore};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

async fn create_app() -> (Router, Arc<MemoryRbacStore>) {
    let store = Arc::new(MemoryRbacStore::new());
    let editor = store.create_role("editor").await.unwrap();
    let read = store.create_permission("posts.read").await.unwrap();
    store.create_permission("posts.write").await.unwrap();
    store.attach_permission(editor.id, read.id).await.unwrap();

    let identifier = Arc::new(RecordingIdentifier::returning(create_test_identity()));
    let app = create_test_router(identifier, store.clone());
    (app, store)
}

fn authed(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, "Bearer test-token")
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn permission_names(body: &Value) -> Vec<String> {
    body["permissions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_role_endpoints_require_auth() {
    let (app, _) = create_app().await;
    let request = Request::builder()
        .uri("/v1/roles")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthenticated");
}

#[tokio::test]
async fn test_list_roles() {
    let (app, _) = create_app().await;
    let (status, body) = send(&app, authed("GET", "/v1/roles")).await;

    assert_eq!(status, StatusCode::OK);
    let roles = body["roles"].as_array().unwrap();
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0]["name"], "editor");
}

#[tokio::test]
async fn test_role_permissions() {
    let (app, _) = create_app().await;
    let (status, body) = send(&app, authed("GET", "/v1/roles/1/permissions")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role_id"], 1);
    assert_eq!(permission_names(&body), vec!["posts.read"]);
}

#[tokio::test]
async fn test_unknown_role_is_not_found() {
    let (app, _) = create_app().await;
    let (status, body) = send(&app, authed("GET", "/v1/roles/999/permissions")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found: role 999");
}

#[tokio::test]
async fn test_attach_is_idempotent_over_http() {
    let (app, store) = create_app().await;

    for _ in 0..2 {
        let (status, _) = send(&app, authed("PUT", "/v1/roles/1/permissions/2")).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    let (_, body) = send(&app, authed("GET", "/v1/roles/1/permissions")).await;
    assert_eq!(permission_names(&body), vec!["posts.read", "posts.write"]);
    assert_eq!(store.permissions_for_role(1).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_attach_unknown_permission_is_not_found() {
    let (app, _) = create_app().await;
    let (status, _) = send(&app, authed("PUT", "/v1/roles/1/permissions/77")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_detach_permission() {
    let (app, store) = create_app().await;

    let (status, _) = send(&app, authed("DELETE", "/v1/roles/1/permissions/1")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(store.permissions_for_role(1).await.unwrap().is_empty());

    // Detaching an absent link is a no-op
    let (status, _) = send(&app, authed("DELETE", "/v1/roles/1/permissions/1")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // The permission itself survives
    assert!(store.find_permission(1).await.unwrap().is_some());
}

#[tokio::test]
async fn test_out_of_band_changes_are_visible() {
    let (app, store) = create_app().await;
    let (_, body) = send(&app, authed("GET", "/v1/roles/1/permissions")).await;
    assert_eq!(permission_names(&body), vec!["posts.read"]);

    // Links written by another writer show up on the next request
    store.attach_permission(1, 2).await.unwrap();
    let (_, body) = send(&app, authed("GET", "/v1/roles/1/permissions")).await;
    assert_eq!(permission_names(&body), vec!["posts.read", "posts.write"]);

    store.detach_permission(1, 1).await.unwrap();
    let (_, body) = send(&app, authed("GET", "/v1/roles/1/permissions")).await;
    assert_eq!(permission_names(&body), vec!["posts.write"]);
}
