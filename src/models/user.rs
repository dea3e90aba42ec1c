//! Model người dùng
//! Mật khẩu và đăng nhập do gateway đảm nhiệm, service này không giữ credential

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Người dùng với các cột phạm vi kiểu cũ
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
    pub xa: Option<String>,
    pub tieukhu: Option<String>,
    pub khoanh: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// DTO trả về cho client
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
    pub xa: Option<String>,
    pub tieukhu: Option<String>,
    pub khoanh: Option<String>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            full_name: u.full_name,
            email: u.email,
            is_active: u.is_active,
            xa: u.xa,
            tieukhu: u.tieukhu,
            khoanh: u.khoanh,
        }
    }
}
