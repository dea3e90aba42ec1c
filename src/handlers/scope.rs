//! Handler cây phạm vi dữ liệu

use crate::{
    auth::{identity::Identity, RequireMode},
    error::AppError,
    middleware::AppState,
    repository::ScopeRepository,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// Cây đơn vị hành chính/lâm nghiệp đang hoạt động
pub async fn list_data_scopes(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<impl IntoResponse, AppError> {
    state
        .rbac_service
        .require_permission(&identity, &["admin.datascope.view"], RequireMode::Any)
        .await?;

    let repo = ScopeRepository::new(state.auth_db.clone());
    let scopes = repo.list_active().await?;

    Ok(Json(json!({
        "success": true,
        "data": scopes,
        "count": scopes.len()
    })))
}

/// Người dùng hiện tại có được truy cập một mã phạm vi không.
/// Nút được gán bao trùm mã yêu cầu (bằng hoặc là tổ tiên) thì đạt.
pub async fn check_scope_access(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    // Mã phải tồn tại trong cây
    let repo = ScopeRepository::new(state.auth_db.clone());
    repo.find_by_code(&code).await?.ok_or(AppError::NotFound)?;

    state.rbac_service.require_data_scope(&identity, &code).await?;

    Ok(Json(json!({
        "success": true,
        "data": { "code": code, "granted": true }
    })))
}
