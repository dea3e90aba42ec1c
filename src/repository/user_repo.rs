//! Truy cập dữ liệu người dùng

use crate::{
    error::AppError,
    models::{SetUserScopeRequest, User},
};
use sqlx::PgPool;

pub struct UserRepository {
    db: PgPool,
}

impl UserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Tìm người dùng theo id
    pub async fn find_by_id(&self, id: i32) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    /// Tìm người dùng theo tên đăng nhập
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    /// Liệt kê người dùng
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, AppError> {
        let users =
            sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY username LIMIT $1 OFFSET $2")
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.db)
                .await?;

        Ok(users)
    }

    /// Gán phạm vi thuộc tính kiểu cũ (xã/tiểu khu/khoảnh) cho người dùng.
    /// Gửi None ở cấp nào thì xóa ràng buộc ở cấp đó.
    pub async fn set_scope(
        &self,
        user_id: i32,
        req: &SetUserScopeRequest,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET xa = $2, tieukhu = $3, khoanh = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&req.xa)
        .bind(&req.tieukhu)
        .bind(&req.khoanh)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }
}
