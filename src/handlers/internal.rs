//! Endpoint nội bộ giữa các service
//! Nằm sau middleware khóa nội bộ — các service khác (GIS, tìm kiếm,
//! báo cáo) kéo quyền/vai trò đã phân giải của người dùng từ đây.

use crate::{error::AppError, middleware::AppState};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// Quyền hiệu lực của một người dùng
pub async fn get_user_permissions(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let permissions = state.rbac_service.get_effective_permissions(user_id).await?;

    tracing::debug!(user_id, count = permissions.len(), "Internal permissions lookup");

    Ok(Json(json!({
        "success": true,
        "data": permissions
    })))
}

/// Vai trò hiệu lực của một người dùng
pub async fn get_user_roles(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let roles = state.rbac_service.get_effective_roles(user_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": roles
    })))
}
