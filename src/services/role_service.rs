//! Dịch vụ quản lý vai trò
//! Giữ các bất biến của kho vai trò: tên duy nhất, vai trò hệ thống bất
//! biến, vai trò super admin không bao giờ được sửa quyền, không xóa vai
//! trò còn người dùng. Mọi mutation vô hiệu cache của người dùng bị ảnh
//! hưởng trước khi trả kết quả.

use crate::{
    cache::RbacCache,
    catalog::SUPER_ADMIN_ROLE,
    error::AppError,
    models::{CreateRoleRequest, Permission, Role, RoleWithUserCount, UpdateRoleRequest},
    repository::{PermissionRepository, RoleRepository, ScopeRepository, UserRepository},
};
use sqlx::PgPool;
use std::sync::Arc;

pub struct RoleService {
    db: PgPool,
    cache: Arc<RbacCache>,
}

impl RoleService {
    pub fn new(db: PgPool, cache: Arc<RbacCache>) -> Self {
        Self { db, cache }
    }

    fn role_repo(&self) -> RoleRepository {
        RoleRepository::new(self.db.clone())
    }

    /// Liệt kê vai trò kèm số người dùng
    pub async fn list_roles(&self) -> Result<Vec<RoleWithUserCount>, AppError> {
        self.role_repo().list_with_user_count().await
    }

    /// Một vai trò kèm tập quyền
    pub async fn get_role(&self, role_id: i32) -> Result<(Role, Vec<Permission>), AppError> {
        let repo = self.role_repo();
        let role = repo.find_by_id(role_id).await?.ok_or(AppError::NotFound)?;
        let permissions = repo.get_role_permissions(role_id).await?;
        Ok((role, permissions))
    }

    /// Tạo vai trò mới, gán quyền và phạm vi trong một transaction
    pub async fn create_role(&self, req: &CreateRoleRequest) -> Result<Role, AppError> {
        let repo = self.role_repo();

        if repo.find_by_name(&req.name).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Role '{}' already exists",
                req.name
            )));
        }

        // Mọi id quyền phải tồn tại trong danh mục
        if !req.permission_ids.is_empty() {
            let permission_repo = PermissionRepository::new(self.db.clone());
            let found = permission_repo.find_by_ids(&req.permission_ids).await?;
            if found.len() != req.permission_ids.len() {
                return Err(AppError::Validation(
                    "One or more permission ids do not exist".to_string(),
                ));
            }
        }

        // Mọi id phạm vi phải là nút đang hoạt động trong cây
        if !req.data_scope_ids.is_empty() {
            let scope_repo = ScopeRepository::new(self.db.clone());
            let found = scope_repo.find_by_ids(&req.data_scope_ids).await?;
            if found.len() != req.data_scope_ids.len() {
                return Err(AppError::Validation(
                    "One or more data scope ids do not exist".to_string(),
                ));
            }
        }

        let role = repo.create_with_assignments(req).await?;

        tracing::info!(role_id = role.id, name = %role.name, "Role created");

        Ok(role)
    }

    /// Sửa vai trò — vai trò hệ thống bất biến
    pub async fn update_role(
        &self,
        role_id: i32,
        req: &UpdateRoleRequest,
    ) -> Result<Role, AppError> {
        let repo = self.role_repo();
        let role = repo.find_by_id(role_id).await?.ok_or(AppError::NotFound)?;

        // Super admin chặn trước, không phụ thuộc thứ tự kiểm tra cờ
        if role.name == SUPER_ADMIN_ROLE {
            return Err(AppError::ForbiddenOperation(
                "The super admin role cannot be modified".to_string(),
            ));
        }

        if role.is_system {
            return Err(AppError::ForbiddenOperation(format!(
                "System role '{}' cannot be modified",
                role.name
            )));
        }

        let updated = repo
            .update(role_id, req)
            .await?
            .ok_or(AppError::NotFound)?;

        // is_active đổi thì quyền hiệu lực của người dùng đổi theo
        self.invalidate_role_users(role_id).await?;

        tracing::info!(role_id, "Role updated");

        Ok(updated)
    }

    /// Xóa vai trò — chỉ khi không còn người dùng nào được gán
    pub async fn delete_role(&self, role_id: i32) -> Result<(), AppError> {
        let repo = self.role_repo();
        let role = repo.find_by_id(role_id).await?.ok_or(AppError::NotFound)?;

        if role.name == SUPER_ADMIN_ROLE {
            return Err(AppError::ForbiddenOperation(
                "The super admin role cannot be deleted".to_string(),
            ));
        }

        if role.is_system {
            return Err(AppError::ForbiddenOperation(format!(
                "System role '{}' cannot be deleted",
                role.name
            )));
        }

        let user_count = repo.user_count(role_id).await?;
        if user_count > 0 {
            return Err(AppError::Conflict(format!(
                "Cannot delete role '{}' because it has {} user(s) assigned",
                role.name, user_count
            )));
        }

        repo.delete(role_id).await?;

        tracing::info!(role_id, name = %role.name, "Role deleted");

        Ok(())
    }

    /// Thay toàn bộ tập quyền của vai trò trong một transaction.
    /// Reader song song thấy tập cũ hoặc tập mới, không bao giờ thấy
    /// trạng thái dở dang.
    pub async fn sync_permissions(
        &self,
        role_id: i32,
        permission_ids: &[i32],
    ) -> Result<Vec<Permission>, AppError> {
        let repo = self.role_repo();
        let role = repo.find_by_id(role_id).await?.ok_or(AppError::NotFound)?;

        // Luôn chặn super admin trước mọi kiểm tra khác
        if role.name == SUPER_ADMIN_ROLE {
            return Err(AppError::ForbiddenOperation(
                "Permissions of the super admin role cannot be modified".to_string(),
            ));
        }

        if !permission_ids.is_empty() {
            let permission_repo = PermissionRepository::new(self.db.clone());
            let found = permission_repo.find_by_ids(permission_ids).await?;
            if found.len() != permission_ids.len() {
                return Err(AppError::Validation(
                    "One or more permission ids do not exist".to_string(),
                ));
            }
        }

        repo.sync_permissions(role_id, permission_ids).await?;

        // Vô hiệu đồng bộ cache của mọi người dùng đang giữ vai trò —
        // request kế tiếp phải thấy tập quyền mới
        self.invalidate_role_users(role_id).await?;

        tracing::info!(
            role_id,
            count = permission_ids.len(),
            "Role permissions synced"
        );

        repo.get_role_permissions(role_id).await
    }

    /// Gán vai trò cho người dùng
    pub async fn assign_role(&self, user_id: i32, role_id: i32) -> Result<(), AppError> {
        let repo = self.role_repo();
        repo.find_by_id(role_id).await?.ok_or(AppError::NotFound)?;

        let user_repo = UserRepository::new(self.db.clone());
        user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound)?;

        repo.assign_role_to_user(user_id, role_id).await?;
        self.cache.clear_user(user_id);

        tracing::info!(user_id, role_id, "Role assigned to user");

        Ok(())
    }

    /// Thu hồi vai trò của người dùng
    pub async fn remove_role(&self, user_id: i32, role_id: i32) -> Result<(), AppError> {
        let removed = self.role_repo().remove_role_from_user(user_id, role_id).await?;
        if !removed {
            return Err(AppError::NotFound);
        }

        self.cache.clear_user(user_id);

        tracing::info!(user_id, role_id, "Role removed from user");

        Ok(())
    }

    /// Vô hiệu cache của mọi người dùng đang giữ một vai trò
    async fn invalidate_role_users(&self, role_id: i32) -> Result<(), AppError> {
        let user_ids = self.role_repo().user_ids_with_role(role_id).await?;
        for user_id in user_ids {
            self.cache.clear_user(user_id);
        }
        Ok(())
    }
}
