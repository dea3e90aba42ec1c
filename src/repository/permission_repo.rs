//! Truy cập dữ liệu quyền (danh mục)

use crate::{
    catalog::{self, WILDCARD},
    error::AppError,
    models::Permission,
};
use sqlx::{PgPool, Row};

pub struct PermissionRepository {
    db: PgPool,
}

impl PermissionRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Seed danh mục quyền tích hợp sẵn — upsert theo mã, chạy lại bao nhiêu
    /// lần cũng không sinh bản ghi trùng. Trả về số dòng được chèn mới.
    pub async fn seed_builtin(&self) -> Result<u64, AppError> {
        let mut inserted = 0u64;

        // Quyền wildcard cho vai trò super admin
        inserted += self
            .upsert(
                WILDCARD,
                "Toàn quyền hệ thống",
                WILDCARD,
                WILDCARD,
                WILDCARD,
                Some("Quyền đại diện toàn bộ, chỉ gán cho vai trò super admin"),
            )
            .await?;

        for def in catalog::BUILTIN_PERMISSIONS.iter() {
            let parts = def.parts()?;
            inserted += self
                .upsert(
                    def.code,
                    def.name,
                    &parts.module,
                    &parts.resource,
                    &parts.action,
                    Some(def.description),
                )
                .await?;
        }

        tracing::info!(
            total = catalog::BUILTIN_PERMISSIONS.len() + 1,
            inserted,
            "Permission catalog seeded"
        );

        Ok(inserted)
    }

    /// Upsert một quyền theo mã; trả 1 nếu là dòng mới
    async fn upsert(
        &self,
        code: &str,
        name: &str,
        module: &str,
        resource: &str,
        action: &str,
        description: Option<&str>,
    ) -> Result<u64, AppError> {
        let row = sqlx::query(
            r#"
            INSERT INTO permissions (code, name, module, resource, action, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (code) DO UPDATE
            SET name = EXCLUDED.name,
                module = EXCLUDED.module,
                resource = EXCLUDED.resource,
                action = EXCLUDED.action,
                description = EXCLUDED.description,
                updated_at = NOW()
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(code)
        .bind(name)
        .bind(module)
        .bind(resource)
        .bind(action)
        .bind(description)
        .fetch_one(&self.db)
        .await?;

        let inserted: bool = row.get("inserted");
        Ok(u64::from(inserted))
    }

    /// Liệt kê toàn bộ quyền đang hoạt động
    pub async fn list(&self) -> Result<Vec<Permission>, AppError> {
        let permissions = sqlx::query_as::<_, Permission>(
            "SELECT * FROM permissions WHERE is_active ORDER BY module, resource, action",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(permissions)
    }

    /// Tìm quyền theo mã
    pub async fn find_by_code(&self, code: &str) -> Result<Option<Permission>, AppError> {
        let permission =
            sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE code = $1")
                .bind(code)
                .fetch_optional(&self.db)
                .await?;

        Ok(permission)
    }

    /// Tìm nhiều quyền theo id
    pub async fn find_by_ids(&self, ids: &[i32]) -> Result<Vec<Permission>, AppError> {
        let permissions =
            sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.db)
                .await?;

        Ok(permissions)
    }

    /// Lọc các mã không tồn tại hoặc đã bị vô hiệu trong danh mục
    pub async fn find_invalid_codes(&self, codes: &[String]) -> Result<Vec<String>, AppError> {
        let valid: Vec<String> = sqlx::query_scalar(
            "SELECT code FROM permissions WHERE code = ANY($1) AND is_active",
        )
        .bind(codes)
        .fetch_all(&self.db)
        .await?;

        Ok(codes
            .iter()
            .filter(|c| !valid.contains(c))
            .cloned()
            .collect())
    }
}
