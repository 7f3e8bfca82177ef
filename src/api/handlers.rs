// Request handlers for API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use tracing::{debug, info};

use crate::api::responses::{ApiError, HealthResponse, MeResponse, PermissionsResponse, RolesResponse};
use crate::api::AppState;
use crate::auth::manager::Authenticated;
use crate::core::errors::AuthError;

/// Health check handler
///
/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Identity of the caller and the strategy that authenticated it
///
/// GET /v1/me
pub async fn me_handler(Extension(authenticated): Extension<Authenticated>) -> Json<MeResponse> {
    Json(authenticated)
}

/// GET /v1/roles
pub async fn list_roles_handler(
    State(app_state): State<AppState>,
) -> Result<Json<RolesResponse>, ApiError> {
    let roles = app_state.rbac_store.list_roles().await?;
    Ok(Json(RolesResponse { roles }))
}

/// Permissions of one role, resolved through the role's lazy relation
///
/// GET /v1/roles/:role_id/permissions
pub async fn role_permissions_handler(
    State(app_state): State<AppState>,
    Path(role_id): Path<i64>,
) -> Result<Json<PermissionsResponse>, ApiError> {
    let role = app_state
        .rbac_store
        .find_role(role_id)
        .await?
        .ok_or_else(|| AuthError::NotFound(format!("role {}", role_id)))?;

    let permissions = role.permissions(app_state.rbac_store.as_ref()).await?.to_vec();
    Ok(Json(PermissionsResponse {
        role_id: role.id,
        permissions,
    }))
}

/// Attach a permission to a role; attaching twice is a no-op
///
/// PUT /v1/roles/:role_id/permissions/:permission_id
pub async fn attach_permission_handler(
    State(app_state): State<AppState>,
    Extension(authenticated): Extension<Authenticated>,
    Path((role_id, permission_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    app_state
        .rbac_store
        .attach_permission(role_id, permission_id)
        .await?;

    info!(
        role_id,
        permission_id,
        user_id = authenticated.identity.id,
        "Permission attached to role"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Detach a permission from a role; detaching an absent link is a no-op
///
/// DELETE /v1/roles/:role_id/permissions/:permission_id
pub async fn detach_permission_handler(
    State(app_state): State<AppState>,
    Extension(authenticated): Extension<Authenticated>,
    Path((role_id, permission_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    let removed = app_state
        .rbac_store
        .detach_permission(role_id, permission_id)
        .await?;

    if removed {
        info!(
            role_id,
            permission_id,
            user_id = authenticated.identity.id,
            "Permission detached from role"
        );
    } else {
        debug!(role_id, permission_id, "Detach requested for unlinked pair");
    }
    Ok(StatusCode::NO_CONTENT)
}
