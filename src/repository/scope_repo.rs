//! Truy cập cây phạm vi dữ liệu

use crate::{error::AppError, models::DataScope};
use sqlx::PgPool;

pub struct ScopeRepository {
    db: PgPool,
}

impl ScopeRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Liệt kê các nút đang hoạt động, theo thứ tự cây
    pub async fn list_active(&self) -> Result<Vec<DataScope>, AppError> {
        let scopes = sqlx::query_as::<_, DataScope>(
            "SELECT * FROM data_scopes WHERE is_active ORDER BY path",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(scopes)
    }

    /// Tìm nút theo mã
    pub async fn find_by_code(&self, code: &str) -> Result<Option<DataScope>, AppError> {
        let scope = sqlx::query_as::<_, DataScope>("SELECT * FROM data_scopes WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.db)
            .await?;

        Ok(scope)
    }

    /// Tìm nhiều nút theo id
    pub async fn find_by_ids(&self, ids: &[i32]) -> Result<Vec<DataScope>, AppError> {
        let scopes = sqlx::query_as::<_, DataScope>(
            "SELECT * FROM data_scopes WHERE id = ANY($1) AND is_active",
        )
        .bind(ids)
        .fetch_all(&self.db)
        .await?;

        Ok(scopes)
    }
}
