//! Test tích hợp tầng phân quyền trên CSDL thật
//!
//! Cần PostgreSQL: đặt TEST_AUTH_DATABASE_URL rồi chạy
//! `cargo test -- --ignored`

mod common;

use common::{cleanup, create_test_cache, create_test_config, create_test_user, setup_auth_db};
use matrung_rbac::{
    error::AppError,
    models::CreateRoleRequest,
    repository::{PermissionRepository, RoleRepository},
    services::{RbacService, RoleService},
};
use serial_test::serial;

fn create_role_request(name: &str, permission_ids: Vec<i32>) -> CreateRoleRequest {
    CreateRoleRequest {
        name: name.to_string(),
        description: None,
        permission_ids,
        data_scope_ids: Vec::new(),
    }
}

#[tokio::test]
#[serial]
#[ignore = "requires TEST_AUTH_DATABASE_URL"]
async fn test_seed_is_idempotent() {
    let config = create_test_config();
    let pool = setup_auth_db(&config).await;
    let repo = PermissionRepository::new(pool.clone());

    repo.seed_builtin().await.unwrap();
    let before: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM permissions")
        .fetch_one(&pool)
        .await
        .unwrap();

    // Seed lại danh sách không đổi: không thêm, không xóa dòng nào
    let inserted = repo.seed_builtin().await.unwrap();
    let after: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM permissions")
        .fetch_one(&pool)
        .await
        .unwrap();

    assert_eq!(inserted, 0);
    assert_eq!(before, after);
}

#[tokio::test]
#[serial]
#[ignore = "requires TEST_AUTH_DATABASE_URL"]
async fn test_create_role_duplicate_name_conflicts() {
    let config = create_test_config();
    let pool = setup_auth_db(&config).await;
    cleanup(&pool).await;

    let service = RoleService::new(pool.clone(), create_test_cache());

    service
        .create_role(&create_role_request("verifier", Vec::new()))
        .await
        .unwrap();

    let result = service
        .create_role(&create_role_request("verifier", Vec::new()))
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
#[serial]
#[ignore = "requires TEST_AUTH_DATABASE_URL"]
async fn test_system_role_is_immutable() {
    let config = create_test_config();
    let pool = setup_auth_db(&config).await;
    cleanup(&pool).await;

    // Vai trò hệ thống tạo thẳng bằng SQL (seed không sinh loại này)
    let role_id: i32 = sqlx::query_scalar(
        "INSERT INTO roles (name, is_system) VALUES ('kiemlam_htql', TRUE) RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    let service = RoleService::new(pool.clone(), create_test_cache());

    let update = service
        .update_role(
            role_id,
            &matrung_rbac::models::UpdateRoleRequest {
                description: Some("x".to_string()),
                is_active: None,
            },
        )
        .await;
    assert!(matches!(update, Err(AppError::ForbiddenOperation(_))));

    let delete = service.delete_role(role_id).await;
    assert!(matches!(delete, Err(AppError::ForbiddenOperation(_))));

    // Tập quyền của vai trò không được thay đổi
    let perms = RoleRepository::new(pool.clone())
        .get_role_permissions(role_id)
        .await
        .unwrap();
    assert!(perms.is_empty());
}

#[tokio::test]
#[serial]
#[ignore = "requires TEST_AUTH_DATABASE_URL"]
async fn test_delete_role_with_users_conflicts_with_count() {
    let config = create_test_config();
    let pool = setup_auth_db(&config).await;
    cleanup(&pool).await;

    let service = RoleService::new(pool.clone(), create_test_cache());
    let role = service
        .create_role(&create_role_request("verifier", Vec::new()))
        .await
        .unwrap();

    let user_id = create_test_user(&pool, "kiemlam_sk").await;
    service.assign_role(user_id, role.id).await.unwrap();

    let result = service.delete_role(role.id).await;
    match result {
        Err(AppError::Conflict(msg)) => assert!(msg.contains("1 user(s)")),
        other => panic!("expected Conflict, got {other:?}"),
    }

    // Thu hồi hết gán thì xóa được
    service.remove_role(user_id, role.id).await.unwrap();
    service.delete_role(role.id).await.unwrap();
}

#[tokio::test]
#[serial]
#[ignore = "requires TEST_AUTH_DATABASE_URL"]
async fn test_super_admin_permissions_cannot_be_synced() {
    let config = create_test_config();
    let pool = setup_auth_db(&config).await;

    let permission_repo = PermissionRepository::new(pool.clone());
    permission_repo.seed_builtin().await.unwrap();
    let super_admin = RoleRepository::new(pool.clone())
        .ensure_super_admin()
        .await
        .unwrap();

    let service = RoleService::new(pool.clone(), create_test_cache());

    let result = service.sync_permissions(super_admin.id, &[]).await;
    assert!(matches!(result, Err(AppError::ForbiddenOperation(_))));

    // Quyền wildcard vẫn nguyên vẹn
    let perms = RoleRepository::new(pool.clone())
        .get_role_permissions(super_admin.id)
        .await
        .unwrap();
    assert!(perms.iter().any(|p| p.code == "*"));
}

#[tokio::test]
#[serial]
#[ignore = "requires TEST_AUTH_DATABASE_URL"]
async fn test_sync_permissions_replaces_whole_set() {
    let config = create_test_config();
    let pool = setup_auth_db(&config).await;
    cleanup(&pool).await;

    let permission_repo = PermissionRepository::new(pool.clone());
    permission_repo.seed_builtin().await.unwrap();

    let view = permission_repo
        .find_by_code("gis.matrung.view")
        .await
        .unwrap()
        .unwrap();
    let update = permission_repo
        .find_by_code("gis.verification.update")
        .await
        .unwrap()
        .unwrap();

    let service = RoleService::new(pool.clone(), create_test_cache());
    let role = service
        .create_role(&create_role_request("verifier", vec![view.id]))
        .await
        .unwrap();

    // Thay cả tập
    let synced = service
        .sync_permissions(role.id, &[update.id])
        .await
        .unwrap();
    assert_eq!(synced.len(), 1);
    assert_eq!(synced[0].code, "gis.verification.update");

    // Đồng bộ về tập rỗng cũng hợp lệ
    let synced = service.sync_permissions(role.id, &[]).await.unwrap();
    assert!(synced.is_empty());
}

#[tokio::test]
#[serial]
#[ignore = "requires TEST_AUTH_DATABASE_URL"]
async fn test_effective_permissions_union_and_invalidation() {
    let config = create_test_config();
    let pool = setup_auth_db(&config).await;
    cleanup(&pool).await;

    let permission_repo = PermissionRepository::new(pool.clone());
    permission_repo.seed_builtin().await.unwrap();

    let view = permission_repo
        .find_by_code("gis.matrung.view")
        .await
        .unwrap()
        .unwrap();
    let update = permission_repo
        .find_by_code("gis.verification.update")
        .await
        .unwrap()
        .unwrap();

    let cache = create_test_cache();
    let role_service = RoleService::new(pool.clone(), cache.clone());
    let rbac = RbacService::new(pool.clone(), cache.clone());

    // Hai vai trò chồng quyền — hợp và khử trùng lặp
    let viewer = role_service
        .create_role(&create_role_request("viewer", vec![view.id]))
        .await
        .unwrap();
    let verifier = role_service
        .create_role(&create_role_request("verifier", vec![view.id, update.id]))
        .await
        .unwrap();

    let user_id = create_test_user(&pool, "kiemlam_sk").await;
    role_service.assign_role(user_id, viewer.id).await.unwrap();
    role_service.assign_role(user_id, verifier.id).await.unwrap();

    let permissions = rbac.get_effective_permissions(user_id).await.unwrap();
    let codes: Vec<&str> = permissions.iter().map(|p| p.code.as_str()).collect();
    assert_eq!(permissions.len(), 2);
    assert!(codes.contains(&"gis.matrung.view"));
    assert!(codes.contains(&"gis.verification.update"));

    // Sửa quyền qua service: cache của người dùng bị vô hiệu đồng bộ,
    // lần đọc kế tiếp thấy ngay tập mới
    role_service
        .sync_permissions(verifier.id, &[view.id])
        .await
        .unwrap();

    let permissions = rbac.get_effective_permissions(user_id).await.unwrap();
    assert_eq!(permissions.len(), 1);
    assert_eq!(permissions[0].code, "gis.matrung.view");
}

#[tokio::test]
#[serial]
#[ignore = "requires TEST_AUTH_DATABASE_URL"]
async fn test_inactive_role_contributes_nothing() {
    let config = create_test_config();
    let pool = setup_auth_db(&config).await;
    cleanup(&pool).await;

    let permission_repo = PermissionRepository::new(pool.clone());
    permission_repo.seed_builtin().await.unwrap();
    let view = permission_repo
        .find_by_code("gis.matrung.view")
        .await
        .unwrap()
        .unwrap();

    let cache = create_test_cache();
    let role_service = RoleService::new(pool.clone(), cache.clone());
    let rbac = RbacService::new(pool.clone(), cache.clone());

    let role = role_service
        .create_role(&create_role_request("viewer", vec![view.id]))
        .await
        .unwrap();
    let user_id = create_test_user(&pool, "kiemlam_sk").await;
    role_service.assign_role(user_id, role.id).await.unwrap();

    // Khóa vai trò
    role_service
        .update_role(
            role.id,
            &matrung_rbac::models::UpdateRoleRequest {
                description: None,
                is_active: Some(false),
            },
        )
        .await
        .unwrap();

    let permissions = rbac.get_effective_permissions(user_id).await.unwrap();
    assert!(permissions.is_empty());
}
