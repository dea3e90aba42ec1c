//! Handler danh mục quyền

use crate::{
    auth::{identity::Identity, RequireMode},
    error::AppError,
    middleware::AppState,
    models::ValidateCodesRequest,
    repository::PermissionRepository,
};
use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

/// Liệt kê toàn bộ quyền đang hoạt động
pub async fn list_permissions(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<impl IntoResponse, AppError> {
    state
        .rbac_service
        .require_permission(&identity, &["role.role.view"], RequireMode::Any)
        .await?;

    let repo = PermissionRepository::new(state.auth_db.clone());
    let permissions = repo.list().await?;

    Ok(Json(json!({
        "success": true,
        "data": permissions,
        "count": permissions.len()
    })))
}

/// Cây quyền cho UI: module → resource → actions
pub async fn permission_tree(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<impl IntoResponse, AppError> {
    state
        .rbac_service
        .require_permission(&identity, &["role.role.view"], RequireMode::Any)
        .await?;

    let tree = state.rbac_service.permission_tree().await?;

    Ok(Json(json!({
        "success": true,
        "data": tree
    })))
}

/// Kiểm tra danh sách mã quyền (chuẩn hóa mã cũ, gắn cờ mã lạ)
pub async fn validate_codes(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(req): Json<ValidateCodesRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .rbac_service
        .require_permission(&identity, &["role.role.view"], RequireMode::Any)
        .await?;

    if req.codes.is_empty() {
        return Err(AppError::Validation(
            "The 'codes' list must not be empty".to_string(),
        ));
    }

    let result = state.rbac_service.validate_permission_codes(&req.codes).await?;

    Ok(Json(json!({
        "success": true,
        "data": result
    })))
}
