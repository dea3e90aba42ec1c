//! Handler quản lý vai trò

use crate::{
    auth::{identity::Identity, RequireMode},
    error::AppError,
    middleware::AppState,
    models::{CreateRoleRequest, SyncPermissionsRequest, UpdateRoleRequest},
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

// ==================== Roles ====================

/// Liệt kê vai trò
pub async fn list_roles(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<impl IntoResponse, AppError> {
    state
        .rbac_service
        .require_permission(&identity, &["role.role.view"], RequireMode::Any)
        .await?;

    let roles = state.role_service.list_roles().await?;

    Ok(Json(json!({
        "success": true,
        "data": roles,
        "count": roles.len()
    })))
}

/// Tạo vai trò
pub async fn create_role(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(req): Json<CreateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .rbac_service
        .require_permission(&identity, &["role.role.create"], RequireMode::Any)
        .await?;

    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let role = state.role_service.create_role(&req).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Tạo vai trò thành công",
        "data": role
    })))
}

/// Chi tiết vai trò kèm tập quyền
pub async fn get_role(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    state
        .rbac_service
        .require_permission(&identity, &["role.role.view"], RequireMode::Any)
        .await?;

    let (role, permissions) = state.role_service.get_role(id).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "role": role,
            "permissions": permissions
        }
    })))
}

/// Sửa vai trò
pub async fn update_role(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<i32>,
    Json(req): Json<UpdateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .rbac_service
        .require_permission(&identity, &["role.role.update"], RequireMode::Any)
        .await?;

    let role = state.role_service.update_role(id, &req).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Cập nhật vai trò thành công",
        "data": role
    })))
}

/// Xóa vai trò
pub async fn delete_role(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    state
        .rbac_service
        .require_permission(&identity, &["role.role.delete"], RequireMode::Any)
        .await?;

    state.role_service.delete_role(id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Xóa vai trò thành công"
    })))
}

// ==================== Permissions ====================

/// Thay toàn bộ tập quyền của vai trò
pub async fn sync_role_permissions(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<i32>,
    Json(req): Json<SyncPermissionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .rbac_service
        .require_permission(&identity, &["role.permission.sync"], RequireMode::Any)
        .await?;

    let permissions = state
        .role_service
        .sync_permissions(id, &req.permission_ids)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Đồng bộ quyền thành công",
        "data": permissions
    })))
}
