//! Model quyền và vai trò

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Quyền — mã duy nhất dạng `module.resource.action`
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Permission {
    pub id: i32,
    pub code: String,
    pub name: String,
    pub module: String,
    pub resource: String,
    pub action: String,
    pub description: Option<String>,
    pub is_active: bool,
}

/// Vai trò
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub is_system: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Vai trò kèm số người dùng đang được gán
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RoleWithUserCount {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub is_system: bool,
    pub is_active: bool,
    pub user_count: i64,
}

/// Yêu cầu tạo vai trò — quyền và phạm vi được gán trong cùng một transaction
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub permission_ids: Vec<i32>,
    #[serde(default)]
    pub data_scope_ids: Vec<i32>,
}

/// Yêu cầu sửa vai trò
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Yêu cầu thay toàn bộ tập quyền của vai trò
#[derive(Debug, Deserialize)]
pub struct SyncPermissionsRequest {
    pub permission_ids: Vec<i32>,
}

/// Yêu cầu gán vai trò cho người dùng
#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role_id: i32,
}

/// Yêu cầu kiểm tra danh sách mã quyền
#[derive(Debug, Deserialize)]
pub struct ValidateCodesRequest {
    pub codes: Vec<String>,
}

/// Kết quả kiểm tra mã quyền
#[derive(Debug, Serialize)]
pub struct ValidateCodesResponse {
    pub valid: bool,
    pub invalid: Vec<String>,
}
