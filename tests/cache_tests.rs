//! Test cache quyền
//!
//! Sau khi vô hiệu, lần đọc kế tiếp bắt buộc trượt cache — resolver phải
//! quay lại CSDL thay vì trả dữ liệu cũ.

use chrono::Utc;
use matrung_rbac::cache::RbacCache;
use matrung_rbac::models::{DataScope, Permission, Role};
use std::sync::Arc;
use std::time::Duration;

fn permission(id: i32, code: &str) -> Permission {
    Permission {
        id,
        code: code.to_string(),
        name: code.to_string(),
        module: "gis".to_string(),
        resource: "matrung".to_string(),
        action: "view".to_string(),
        description: None,
        is_active: true,
    }
}

fn role(id: i32, name: &str) -> Role {
    Role {
        id,
        name: name.to_string(),
        description: None,
        is_system: false,
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn data_scope(id: i32, code: &str) -> DataScope {
    DataScope {
        id,
        kind: "COMMUNE".to_string(),
        code: code.to_string(),
        name: code.to_string(),
        parent_id: None,
        path: format!("/VN/SL/{code}"),
        level: 3,
        is_active: true,
    }
}

#[test]
fn test_hit_within_ttl() {
    let cache = RbacCache::new(Duration::from_secs(300));
    cache.put_permissions(1, vec![permission(1, "gis.matrung.view")]);

    let cached = cache.get_permissions(1).expect("cache hit expected");
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].code, "gis.matrung.view");
}

#[test]
fn test_clear_user_forces_requery() {
    let cache = RbacCache::new(Duration::from_secs(300));
    cache.put_permissions(1, vec![permission(1, "gis.matrung.view")]);
    cache.put_roles(1, vec![role(1, "verifier")]);
    cache.put_data_scopes(1, vec![data_scope(1, "CK")]);

    cache.clear_user(1);

    // Trượt cache ở cả ba không gian tên: lần gọi kế tiếp phải
    // truy vấn lại kho lưu trữ phía sau
    assert!(cache.get_permissions(1).is_none());
    assert!(cache.get_roles(1).is_none());
    assert!(cache.get_data_scopes(1).is_none());
}

#[test]
fn test_clear_user_does_not_touch_others() {
    let cache = RbacCache::new(Duration::from_secs(300));
    cache.put_permissions(1, vec![permission(1, "a.b.c")]);
    cache.put_permissions(2, vec![permission(2, "d.e.f")]);

    cache.clear_user(1);

    assert!(cache.get_permissions(1).is_none());
    assert!(cache.get_permissions(2).is_some());
}

#[test]
fn test_clear_all_for_bulk_role_edits() {
    let cache = RbacCache::new(Duration::from_secs(300));
    for user_id in 1..=5 {
        cache.put_permissions(user_id, vec![permission(user_id, "x.y.z")]);
    }

    cache.clear_all();

    for user_id in 1..=5 {
        assert!(cache.get_permissions(user_id).is_none());
    }
}

#[test]
fn test_ttl_expiry() {
    let cache = RbacCache::new(Duration::from_millis(20));
    cache.put_permissions(1, vec![permission(1, "gis.matrung.view")]);

    assert!(cache.get_permissions(1).is_some());
    std::thread::sleep(Duration::from_millis(40));
    assert!(cache.get_permissions(1).is_none());
}

#[test]
fn test_sweep_removes_expired_entries() {
    let cache = RbacCache::new(Duration::from_millis(20));
    cache.put_permissions(1, vec![permission(1, "a.b.c")]);
    cache.put_roles(2, vec![role(2, "viewer")]);

    std::thread::sleep(Duration::from_millis(40));
    cache.sweep();

    assert!(cache.get_permissions(1).is_none());
    assert!(cache.get_roles(2).is_none());
}

#[tokio::test]
async fn test_background_sweeper_runs() {
    let cache = Arc::new(RbacCache::new(Duration::from_millis(20)));
    cache.put_permissions(1, vec![permission(1, "a.b.c")]);

    let handle = cache.start_sweeper(Duration::from_millis(10));

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(cache.get_permissions(1).is_none());

    handle.abort();
}

#[test]
fn test_last_write_wins_population() {
    // Ghi đè là hợp lệ: entry là dữ liệu dẫn xuất, tính lại luôn an toàn
    let cache = RbacCache::new(Duration::from_secs(300));
    cache.put_permissions(1, vec![permission(1, "a.b.c")]);
    cache.put_permissions(1, vec![permission(2, "d.e.f"), permission(3, "g.h.i")]);

    let cached = cache.get_permissions(1).unwrap();
    assert_eq!(cached.len(), 2);
}
