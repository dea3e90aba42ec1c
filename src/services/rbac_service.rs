//! Dịch vụ phân giải quyền và vai trò
//! Hợp quyền/vai trò/phạm vi qua mọi vai trò đang hoạt động của người dùng,
//! có cache TTL 5 phút. Cache là dữ liệu dẫn xuất — nguồn chuẩn luôn là CSDL.

use crate::{
    auth::{evaluator::RequireMode, identity::Identity, PermissionSet},
    cache::RbacCache,
    catalog,
    error::AppError,
    models::{AttributeScope, DataScope, Permission, Role, ValidateCodesResponse},
    repository::{PermissionRepository, UserRepository},
};
use sqlx::PgPool;
use std::sync::Arc;

/// Người dùng đã phân giải đầy đủ: đầu vào cho cổng phạm vi
#[derive(Debug, Clone)]
pub struct ResolvedUser {
    pub user_id: i32,
    pub username: String,
    /// Hợp vai trò từ gateway và từ CSDL
    pub roles: Vec<String>,
    pub permissions: PermissionSet,
    pub attribute_scope: AttributeScope,
    pub data_scopes: Vec<DataScope>,
}

pub struct RbacService {
    db: PgPool,
    cache: Arc<RbacCache>,
}

impl RbacService {
    pub fn new(db: PgPool, cache: Arc<RbacCache>) -> Self {
        Self { db, cache }
    }

    /// Quyền hiệu lực của người dùng: join qua user_roles → roles →
    /// role_permissions → permissions, lọc is_active ở cả ba tầng,
    /// khử trùng lặp theo mã
    pub async fn get_effective_permissions(
        &self,
        user_id: i32,
    ) -> Result<Vec<Permission>, AppError> {
        if let Some(cached) = self.cache.get_permissions(user_id) {
            return Ok(cached);
        }

        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT DISTINCT p.id, p.code, p.name, p.module, p.resource, p.action,
                   p.description, p.is_active
            FROM user_roles ur
            JOIN users u ON u.id = ur.user_id AND u.is_active
            JOIN roles r ON r.id = ur.role_id AND r.is_active
            JOIN role_permissions rp ON rp.role_id = r.id
            JOIN permissions p ON p.id = rp.permission_id AND p.is_active
            WHERE ur.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        self.cache.put_permissions(user_id, permissions.clone());
        tracing::debug!(user_id, count = permissions.len(), "Permissions resolved and cached");

        Ok(permissions)
    }

    /// Vai trò hiệu lực của người dùng
    pub async fn get_effective_roles(&self, user_id: i32) -> Result<Vec<Role>, AppError> {
        if let Some(cached) = self.cache.get_roles(user_id) {
            return Ok(cached);
        }

        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT r.*
            FROM user_roles ur
            JOIN users u ON u.id = ur.user_id AND u.is_active
            JOIN roles r ON r.id = ur.role_id AND r.is_active
            WHERE ur.user_id = $1
            ORDER BY r.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        self.cache.put_roles(user_id, roles.clone());

        Ok(roles)
    }

    /// Phạm vi dữ liệu hiệu lực: hợp qua mọi vai trò
    pub async fn get_effective_data_scopes(
        &self,
        user_id: i32,
    ) -> Result<Vec<DataScope>, AppError> {
        if let Some(cached) = self.cache.get_data_scopes(user_id) {
            return Ok(cached);
        }

        let scopes = sqlx::query_as::<_, DataScope>(
            r#"
            SELECT DISTINCT ds.id, ds.kind, ds.code, ds.name, ds.parent_id,
                   ds.path, ds.level, ds.is_active
            FROM user_roles ur
            JOIN users u ON u.id = ur.user_id AND u.is_active
            JOIN roles r ON r.id = ur.role_id AND r.is_active
            JOIN role_data_scopes rds ON rds.role_id = r.id
            JOIN data_scopes ds ON ds.id = rds.data_scope_id AND ds.is_active
            WHERE ur.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        self.cache.put_data_scopes(user_id, scopes.clone());

        Ok(scopes)
    }

    /// Tập quyền đã phân giải, dùng cho evaluator
    pub async fn permission_set(&self, user_id: i32) -> Result<PermissionSet, AppError> {
        let permissions = self.get_effective_permissions(user_id).await?;
        Ok(PermissionSet::from_codes(
            permissions.into_iter().map(|p| p.code),
        ))
    }

    /// Phân giải đầy đủ một định danh từ gateway.
    /// Quyền luôn lấy từ CSDL (header x-user-permissions chỉ là gợi ý của
    /// gateway, không phải nguồn chuẩn). Phạm vi thuộc tính ưu tiên cột
    /// trên bản ghi người dùng, rơi về header khi CSDL không có.
    pub async fn resolve_user(&self, identity: &Identity) -> Result<ResolvedUser, AppError> {
        let (permissions, db_roles, data_scopes) = futures::try_join!(
            self.permission_set(identity.user_id),
            self.get_effective_roles(identity.user_id),
            self.get_effective_data_scopes(identity.user_id),
        )?;

        let mut roles = identity.roles.clone();
        for role in &db_roles {
            if !roles.contains(&role.name) {
                roles.push(role.name.clone());
            }
        }

        let user_repo = UserRepository::new(self.db.clone());
        let attribute_scope = match user_repo.find_by_id(identity.user_id).await? {
            Some(user) if user.is_active => {
                let db_scope = AttributeScope {
                    xa: user.xa,
                    tieukhu: user.tieukhu,
                    khoanh: user.khoanh,
                };
                if db_scope.is_empty() {
                    identity.scope.clone()
                } else {
                    db_scope
                }
            }
            // Người dùng không còn trong CSDL hoặc bị khóa: không vai trò
            // nào còn hiệu lực, phạm vi lấy theo header
            _ => identity.scope.clone(),
        };

        Ok(ResolvedUser {
            user_id: identity.user_id,
            username: identity.username.clone(),
            roles,
            permissions,
            attribute_scope,
            data_scopes,
        })
    }

    /// Cổng quyền tái sử dụng cho mọi handler: 403 khi thiếu quyền
    pub async fn require_permission<S: AsRef<str>>(
        &self,
        identity: &Identity,
        codes: &[S],
        mode: RequireMode,
    ) -> Result<(), AppError> {
        let set = self.permission_set(identity.user_id).await?;

        if let Err(err) = set.require(codes, mode) {
            metrics::counter!("rbac.permission.denied").increment(1);
            let required: Vec<&str> = codes.iter().map(|c| c.as_ref()).collect();
            tracing::warn!(
                user_id = identity.user_id,
                username = %identity.username,
                required = ?required,
                "Permission denied"
            );
            return Err(err);
        }

        Ok(())
    }

    /// Cổng phạm vi: người dùng phải giữ một nút bao trùm mã phạm vi yêu cầu
    pub async fn require_data_scope(
        &self,
        identity: &Identity,
        scope_code: &str,
    ) -> Result<(), AppError> {
        let scopes = self.get_effective_data_scopes(identity.user_id).await?;

        let granted = scopes.iter().any(|s| s.subsumes_code(scope_code));
        if !granted {
            tracing::warn!(
                user_id = identity.user_id,
                scope_code,
                "Data scope access denied"
            );
            return Err(AppError::Forbidden);
        }

        Ok(())
    }

    /// Vô hiệu cache của một người dùng — gọi ngay sau mỗi lần
    /// sửa vai trò/quyền liên quan, trước khi trả kết quả
    pub fn clear_user_cache(&self, user_id: i32) {
        self.cache.clear_user(user_id);
    }

    /// Vô hiệu toàn bộ cache — cho sửa vai trò hàng loạt
    pub fn clear_all_cache(&self) {
        self.cache.clear_all();
    }

    /// Kiểm tra danh sách mã quyền: chuẩn hóa rồi đối chiếu danh mục
    pub async fn validate_permission_codes(
        &self,
        codes: &[String],
    ) -> Result<ValidateCodesResponse, AppError> {
        let mut invalid = Vec::new();
        let mut normalized = Vec::new();

        for code in codes {
            match catalog::normalize_code(code) {
                Ok(canonical) => normalized.push(canonical),
                Err(_) => invalid.push(code.clone()),
            }
        }

        let permission_repo = PermissionRepository::new(self.db.clone());
        invalid.extend(permission_repo.find_invalid_codes(&normalized).await?);

        Ok(ValidateCodesResponse {
            valid: invalid.is_empty(),
            invalid,
        })
    }

    /// Cây quyền cho UI: module → resource → actions
    pub async fn permission_tree(&self) -> Result<serde_json::Value, AppError> {
        let permission_repo = PermissionRepository::new(self.db.clone());
        let permissions = permission_repo.list().await?;

        let mut tree = serde_json::Map::new();
        for perm in permissions {
            let module = tree
                .entry(perm.module.clone())
                .or_insert_with(|| serde_json::json!({ "module": perm.module, "resources": {} }));

            let resources = module["resources"].as_object_mut().expect("resources map");
            let resource = resources
                .entry(perm.resource.clone())
                .or_insert_with(|| serde_json::json!({ "resource": perm.resource, "actions": [] }));

            resource["actions"]
                .as_array_mut()
                .expect("actions array")
                .push(serde_json::json!({
                    "id": perm.id,
                    "code": perm.code,
                    "name": perm.name,
                    "action": perm.action,
                    "description": perm.description,
                }));
        }

        Ok(serde_json::Value::Object(tree))
    }
}
