//! Cache quyền trong tiến trình
//! Service cache tường minh, có vòng đời riêng và được inject vào resolver
//! thay vì trạng thái toàn cục. Entry là dữ liệu dẫn xuất thuần túy nên
//! ghi đè lẫn nhau (last-write-wins) là chấp nhận được; độ trễ tối đa
//! bằng TTL trừ khi bị vô hiệu tường minh sau mỗi lần sửa quyền.

use crate::models::{DataScope, Permission, Role};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Entry<T> {
    value: T,
    inserted_at: Instant,
}

impl<T: Clone> Entry<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
        }
    }

    fn get(&self, ttl: Duration) -> Option<T> {
        if self.inserted_at.elapsed() < ttl {
            Some(self.value.clone())
        } else {
            None
        }
    }
}

/// Cache theo người dùng cho quyền, vai trò và phạm vi dữ liệu đã phân giải
pub struct RbacCache {
    ttl: Duration,
    permissions: DashMap<i32, Entry<Vec<Permission>>>,
    roles: DashMap<i32, Entry<Vec<Role>>>,
    data_scopes: DashMap<i32, Entry<Vec<DataScope>>>,
}

impl RbacCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            permissions: DashMap::new(),
            roles: DashMap::new(),
            data_scopes: DashMap::new(),
        }
    }

    pub fn get_permissions(&self, user_id: i32) -> Option<Vec<Permission>> {
        Self::get_from(&self.permissions, user_id, self.ttl, "permissions")
    }

    pub fn put_permissions(&self, user_id: i32, value: Vec<Permission>) {
        self.permissions.insert(user_id, Entry::new(value));
    }

    pub fn get_roles(&self, user_id: i32) -> Option<Vec<Role>> {
        Self::get_from(&self.roles, user_id, self.ttl, "roles")
    }

    pub fn put_roles(&self, user_id: i32, value: Vec<Role>) {
        self.roles.insert(user_id, Entry::new(value));
    }

    pub fn get_data_scopes(&self, user_id: i32) -> Option<Vec<DataScope>> {
        Self::get_from(&self.data_scopes, user_id, self.ttl, "data_scopes")
    }

    pub fn put_data_scopes(&self, user_id: i32, value: Vec<DataScope>) {
        self.data_scopes.insert(user_id, Entry::new(value));
    }

    fn get_from<T: Clone>(
        map: &DashMap<i32, Entry<T>>,
        user_id: i32,
        ttl: Duration,
        namespace: &'static str,
    ) -> Option<T> {
        match map.get(&user_id).and_then(|e| e.get(ttl)) {
            Some(value) => {
                metrics::counter!("rbac.cache.hit", "namespace" => namespace).increment(1);
                Some(value)
            }
            None => {
                metrics::counter!("rbac.cache.miss", "namespace" => namespace).increment(1);
                None
            }
        }
    }

    /// Vô hiệu toàn bộ entry của một người dùng — gọi đồng bộ
    /// ngay trong request sửa vai trò/quyền, trước khi trả kết quả
    pub fn clear_user(&self, user_id: i32) {
        self.permissions.remove(&user_id);
        self.roles.remove(&user_id);
        self.data_scopes.remove(&user_id);
        tracing::debug!(user_id, "RBAC cache cleared for user");
    }

    /// Vô hiệu toàn bộ cache — dùng cho các thao tác sửa vai trò hàng loạt
    pub fn clear_all(&self) {
        self.permissions.clear();
        self.roles.clear();
        self.data_scopes.clear();
        tracing::info!("All RBAC cache cleared");
    }

    /// Quét dọn các entry đã hết hạn
    pub fn sweep(&self) {
        let ttl = self.ttl;
        self.permissions.retain(|_, e| e.inserted_at.elapsed() < ttl);
        self.roles.retain(|_, e| e.inserted_at.elapsed() < ttl);
        self.data_scopes.retain(|_, e| e.inserted_at.elapsed() < ttl);
    }

    /// Chạy vòng quét dọn nền theo chu kỳ cấu hình
    pub fn start_sweeper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                cache.sweep();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_role(id: i32, name: &str) -> Role {
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

    #[test]
    fn test_put_get_roles() {
        let cache = RbacCache::new(Duration::from_secs(300));
        cache.put_roles(1, vec![sample_role(1, "verifier")]);

        let roles = cache.get_roles(1).unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].name, "verifier");

        assert!(cache.get_roles(2).is_none());
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let cache = RbacCache::new(Duration::from_millis(10));
        cache.put_roles(1, vec![sample_role(1, "verifier")]);

        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.get_roles(1).is_none());
    }

    #[test]
    fn test_clear_user_removes_all_namespaces() {
        let cache = RbacCache::new(Duration::from_secs(300));
        cache.put_roles(7, vec![sample_role(1, "verifier")]);
        cache.put_permissions(7, vec![]);
        cache.put_data_scopes(7, vec![]);
        cache.put_roles(8, vec![sample_role(2, "viewer")]);

        cache.clear_user(7);

        assert!(cache.get_roles(7).is_none());
        assert!(cache.get_permissions(7).is_none());
        assert!(cache.get_data_scopes(7).is_none());
        // Người dùng khác không bị ảnh hưởng
        assert!(cache.get_roles(8).is_some());
    }

    #[test]
    fn test_sweep_evicts_expired() {
        let cache = RbacCache::new(Duration::from_millis(10));
        cache.put_roles(1, vec![sample_role(1, "a")]);
        std::thread::sleep(Duration::from_millis(20));
        cache.sweep();
        assert!(cache.roles.is_empty());
    }

    #[test]
    fn test_clear_all() {
        let cache = RbacCache::new(Duration::from_secs(300));
        cache.put_roles(1, vec![sample_role(1, "a")]);
        cache.put_permissions(2, vec![]);
        cache.clear_all();
        assert!(cache.get_roles(1).is_none());
        assert!(cache.get_permissions(2).is_none());
    }
}
