//! Handler người dùng: gán vai trò, gán phạm vi, tra quyền hiệu lực

use crate::{
    auth::{identity::Identity, RequireMode},
    error::AppError,
    middleware::AppState,
    models::{AssignRoleRequest, SetUserScopeRequest, UserResponse},
    repository::UserRepository,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// Quyền hiệu lực của một người dùng (cho màn hình quản trị)
pub async fn get_user_permissions(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    state
        .rbac_service
        .require_permission(&identity, &["user.user.view"], RequireMode::Any)
        .await?;

    let permissions = state.rbac_service.get_effective_permissions(id).await?;

    Ok(Json(json!({
        "success": true,
        "data": permissions
    })))
}

/// Gán vai trò cho người dùng
pub async fn assign_role(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<i32>,
    Json(req): Json<AssignRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .rbac_service
        .require_permission(&identity, &["user.role.assign"], RequireMode::Any)
        .await?;

    state.role_service.assign_role(id, req.role_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Gán vai trò thành công"
    })))
}

/// Thu hồi vai trò của người dùng
pub async fn remove_role(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path((id, role_id)): Path<(i32, i32)>,
) -> Result<impl IntoResponse, AppError> {
    state
        .rbac_service
        .require_permission(&identity, &["user.role.assign"], RequireMode::Any)
        .await?;

    state.role_service.remove_role(id, role_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Thu hồi vai trò thành công"
    })))
}

/// Gán phạm vi thuộc tính (xã/tiểu khu/khoảnh) cho người dùng
pub async fn set_user_scope(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<i32>,
    Json(req): Json<SetUserScopeRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .rbac_service
        .require_permission(&identity, &["user.scope.assign"], RequireMode::Any)
        .await?;

    let repo = UserRepository::new(state.auth_db.clone());
    let user = repo.set_scope(id, &req).await?.ok_or(AppError::NotFound)?;

    // Phạm vi đổi thì dữ liệu phân giải cũ không còn giá trị
    state.rbac_service.clear_user_cache(id);

    Ok(Json(json!({
        "success": true,
        "message": "Gán phạm vi thành công",
        "data": UserResponse::from(user)
    })))
}
