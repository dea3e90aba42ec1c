//! Truy cập dữ liệu vai trò
//! Các thao tác thay cả tập (tạo kèm gán, đồng bộ quyền) chạy trong một
//! transaction — reader song song chỉ thấy tập cũ trọn vẹn hoặc tập mới
//! trọn vẹn, không bao giờ thấy trạng thái dở dang.

use crate::{
    catalog::{SUPER_ADMIN_ROLE, WILDCARD},
    error::AppError,
    models::{CreateRoleRequest, Permission, Role, RoleWithUserCount, UpdateRoleRequest},
};
use sqlx::PgPool;

pub struct RoleRepository {
    db: PgPool,
}

impl RoleRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ==================== Roles ====================

    /// Liệt kê vai trò kèm số người dùng đang gán
    pub async fn list_with_user_count(&self) -> Result<Vec<RoleWithUserCount>, AppError> {
        let roles = sqlx::query_as::<_, RoleWithUserCount>(
            r#"
            SELECT
                r.id,
                r.name,
                r.description,
                r.is_system,
                r.is_active,
                COUNT(ur.user_id) AS user_count
            FROM roles r
            LEFT JOIN user_roles ur ON ur.role_id = r.id
            GROUP BY r.id
            ORDER BY r.name
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(roles)
    }

    /// Tìm vai trò theo id
    pub async fn find_by_id(&self, id: i32) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(role)
    }

    /// Tìm vai trò theo tên
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.db)
            .await?;

        Ok(role)
    }

    /// Tạo vai trò kèm gán quyền và phạm vi trong một transaction.
    /// Không bao giờ quan sát được trạng thái gán dở dang.
    pub async fn create_with_assignments(
        &self,
        req: &CreateRoleRequest,
    ) -> Result<Role, AppError> {
        let mut tx = self.db.begin().await?;

        let role = sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (name, description)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(&req.name)
        .bind(&req.description)
        .fetch_one(&mut *tx)
        .await?;

        if !req.permission_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO role_permissions (role_id, permission_id)
                SELECT $1, unnest($2::int4[])
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(role.id)
            .bind(&req.permission_ids)
            .execute(&mut *tx)
            .await?;
        }

        if !req.data_scope_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO role_data_scopes (role_id, data_scope_id)
                SELECT $1, unnest($2::int4[])
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(role.id)
            .bind(&req.data_scope_ids)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(role)
    }

    /// Cập nhật vai trò
    pub async fn update(
        &self,
        id: i32,
        req: &UpdateRoleRequest,
    ) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            UPDATE roles
            SET
                description = COALESCE($2, description),
                is_active = COALESCE($3, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&req.description)
        .bind(req.is_active)
        .fetch_optional(&self.db)
        .await?;

        Ok(role)
    }

    /// Xóa vai trò
    pub async fn delete(&self, id: i32) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Số người dùng đang được gán vai trò
    pub async fn user_count(&self, role_id: i32) -> Result<i64, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM user_roles WHERE role_id = $1")
                .bind(role_id)
                .fetch_one(&self.db)
                .await?;

        Ok(count)
    }

    /// Danh sách id người dùng đang giữ vai trò — dùng để vô hiệu cache
    pub async fn user_ids_with_role(&self, role_id: i32) -> Result<Vec<i32>, AppError> {
        let ids: Vec<i32> =
            sqlx::query_scalar("SELECT user_id FROM user_roles WHERE role_id = $1")
                .bind(role_id)
                .fetch_all(&self.db)
                .await?;

        Ok(ids)
    }

    // ==================== Permissions ====================

    /// Quyền của một vai trò
    pub async fn get_role_permissions(&self, role_id: i32) -> Result<Vec<Permission>, AppError> {
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT p.*
            FROM permissions p
            JOIN role_permissions rp ON p.id = rp.permission_id
            WHERE rp.role_id = $1
            ORDER BY p.module, p.resource, p.action
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.db)
        .await?;

        Ok(permissions)
    }

    /// Thay toàn bộ tập quyền của vai trò: xóa hết rồi chèn lại
    /// trong cùng một transaction
    pub async fn sync_permissions(
        &self,
        role_id: i32,
        permission_ids: &[i32],
    ) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;

        if !permission_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO role_permissions (role_id, permission_id)
                SELECT $1, unnest($2::int4[])
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(role_id)
            .bind(permission_ids)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    // ==================== User roles ====================

    /// Gán vai trò cho người dùng
    pub async fn assign_role_to_user(&self, user_id: i32, role_id: i32) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(role_id)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Thu hồi vai trò của người dùng
    pub async fn remove_role_from_user(
        &self,
        user_id: i32,
        role_id: i32,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = $2")
            .bind(user_id)
            .bind(role_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ==================== Seed ====================

    /// Bảo đảm vai trò super admin tồn tại và giữ quyền wildcard
    pub async fn ensure_super_admin(&self) -> Result<Role, AppError> {
        let mut tx = self.db.begin().await?;

        let role = sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (name, description, is_system)
            VALUES ($1, 'Quản trị viên tối cao - Toàn quyền hệ thống', TRUE)
            ON CONFLICT (name) DO UPDATE SET is_system = TRUE, updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(SUPER_ADMIN_ROLE)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            SELECT $1, id FROM permissions WHERE code = $2
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role.id)
        .bind(WILDCARD)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(role)
    }
}
