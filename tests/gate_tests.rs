//! Test cổng truy vấn theo phạm vi
//!
//! Dùng BoundaryLookup giả để kiểm tra thứ tự quyết định của cổng
//! mà không cần PostGIS.

use async_trait::async_trait;
use matrung_rbac::auth::PermissionSet;
use matrung_rbac::error::AppError;
use matrung_rbac::models::{
    AdminAttribution, AttributePredicate, AttributeScope, PointXy, QueryIntent,
};
use matrung_rbac::repository::BoundaryLookup;
use matrung_rbac::services::{ResolvedUser, ScopedQueryGate};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// BoundaryLookup giả: trả dữ liệu cấu hình sẵn, đếm số lần gọi
struct FakeBoundary {
    union_geometry: Option<String>,
    attribution: AdminAttribution,
    fail: bool,
    union_calls: AtomicUsize,
    attribution_calls: AtomicUsize,
}

impl FakeBoundary {
    fn new(union_geometry: Option<&str>, attribution: AdminAttribution) -> Self {
        Self {
            union_geometry: union_geometry.map(String::from),
            attribution,
            fail: false,
            union_calls: AtomicUsize::new(0),
            attribution_calls: AtomicUsize::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            union_geometry: None,
            attribution: AdminAttribution::default(),
            fail: true,
            union_calls: AtomicUsize::new(0),
            attribution_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl BoundaryLookup for FakeBoundary {
    async fn resolve_attribution(
        &self,
        points: &[PointXy],
    ) -> Result<Vec<AdminAttribution>, AppError> {
        self.attribution_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::Internal);
        }
        Ok(points.iter().map(|_| self.attribution.clone()).collect())
    }

    async fn scope_union_geometry(
        &self,
        _predicate: &AttributePredicate,
    ) -> Result<Option<String>, AppError> {
        self.union_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::Internal);
        }
        Ok(self.union_geometry.clone())
    }
}

fn user(roles: &[&str], permissions: &[&str], scope: AttributeScope) -> ResolvedUser {
    ResolvedUser {
        user_id: 42,
        username: "kiemlam_sk".to_string(),
        roles: roles.iter().map(|s| s.to_string()).collect(),
        permissions: PermissionSet::from_codes(permissions.iter().copied()),
        attribute_scope: scope,
        data_scopes: Vec::new(),
    }
}

fn commune_scope(xa: &str) -> AttributeScope {
    AttributeScope {
        xa: Some(xa.to_string()),
        tieukhu: None,
        khoanh: None,
    }
}

fn attribution(xa: &str, tk: &str) -> AdminAttribution {
    AdminAttribution {
        huyen: None,
        xa: Some(xa.to_string()),
        tk: Some(tk.to_string()),
        khoanh: None,
    }
}

#[tokio::test]
async fn test_missing_permission_is_rejected_first() {
    let boundary = Arc::new(FakeBoundary::new(None, AdminAttribution::default()));
    let gate = ScopedQueryGate::new(boundary.clone());

    let user = user(&["verifier"], &["gis.matrung.view"], commune_scope("Chiềng Khoong"));

    let result = gate
        .authorize_and_scope(&user, "gis.verification.update", QueryIntent::Read)
        .await;
    assert!(matches!(result, Err(AppError::Forbidden)));

    // Bị chặn ở bước quyền thì không được tốn truy vấn không gian nào
    assert_eq!(boundary.union_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_bypass_role_gets_no_predicates() {
    let boundary = Arc::new(FakeBoundary::new(Some("{}"), AdminAttribution::default()));
    let gate = ScopedQueryGate::new(boundary.clone());

    // Lãnh đạo không có xa/tieukhu/khoanh vẫn thấy tất cả
    let user = user(&["LanhDao"], &["gis.matrung.view"], AttributeScope::default());

    let decision = gate
        .authorize_and_scope(&user, "gis.matrung.view", QueryIntent::Read)
        .await
        .unwrap();

    assert!(decision.allowed);
    assert!(!decision.empty_result);
    assert!(decision.attribute_predicate.is_none());
    assert!(decision.spatial_predicate.is_none());
    assert!(decision.is_unfiltered());
}

#[tokio::test]
async fn test_unscoped_user_short_circuits_to_empty() {
    let boundary = Arc::new(FakeBoundary::new(Some("{}"), AdminAttribution::default()));
    let gate = ScopedQueryGate::new(boundary.clone());

    let user = user(&["verifier"], &["gis.matrung.view"], AttributeScope::default());

    for intent in [QueryIntent::Read, QueryIntent::Write] {
        let decision = gate
            .authorize_and_scope(&user, "gis.matrung.view", intent)
            .await
            .unwrap();

        assert!(decision.allowed);
        assert!(decision.empty_result);
        assert!(decision.attribute_predicate.is_none());
    }

    // Quyết định rỗng phải có TRƯỚC mọi truy vấn không gian
    assert_eq!(boundary.union_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_restricted_read_precomputes_union_geometry() {
    let geojson = r#"{"type":"MultiPolygon","coordinates":[]}"#;
    let boundary = Arc::new(FakeBoundary::new(Some(geojson), AdminAttribution::default()));
    let gate = ScopedQueryGate::new(boundary.clone());

    let user = user(&["verifier"], &["gis.matrung.view"], commune_scope("Chiềng Khoong"));

    let decision = gate
        .authorize_and_scope(&user, "gis.matrung.view", QueryIntent::Read)
        .await
        .unwrap();

    assert!(!decision.empty_result);
    let predicate = decision.attribute_predicate.unwrap();
    assert_eq!(predicate.xa.as_deref(), Some("Chiềng Khoong"));
    assert_eq!(decision.spatial_predicate.as_deref(), Some(geojson));
    assert_eq!(boundary.union_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_union_failure_narrows_instead_of_widening() {
    let boundary = Arc::new(FakeBoundary::failing());
    let gate = ScopedQueryGate::new(boundary);

    let user = user(&["verifier"], &["gis.matrung.view"], commune_scope("Chiềng Khoong"));

    let decision = gate
        .authorize_and_scope(&user, "gis.matrung.view", QueryIntent::Read)
        .await
        .unwrap();

    // Hợp hình học lỗi: vẫn còn predicate thuộc tính, không mở toàn bộ
    assert!(decision.attribute_predicate.is_some());
    assert!(decision.spatial_predicate.is_none());
    assert!(!decision.is_unfiltered());
}

#[tokio::test]
async fn test_write_intent_skips_union_precompute() {
    let boundary = Arc::new(FakeBoundary::new(Some("{}"), AdminAttribution::default()));
    let gate = ScopedQueryGate::new(boundary.clone());

    let user = user(
        &["verifier"],
        &["gis.verification.update"],
        commune_scope("Chiềng Khoong"),
    );

    let decision = gate
        .authorize_and_scope(&user, "gis.verification.update", QueryIntent::Write)
        .await
        .unwrap();

    assert!(decision.attribute_predicate.is_some());
    // Ghi kiểm tra từng bản ghi, không cần hợp hình học
    assert!(decision.spatial_predicate.is_none());
    assert_eq!(boundary.union_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_pattern_required_permission() {
    let boundary = Arc::new(FakeBoundary::new(None, AdminAttribution::default()));
    let gate = ScopedQueryGate::new(boundary);

    let user = user(
        &["verifier"],
        &["gis.verification.update", "gis.verification.view"],
        commune_scope("Chiềng Khoong"),
    );

    // Yêu cầu dạng pattern khớp các quyền cụ thể đang giữ
    let decision = gate
        .authorize_and_scope(&user, "gis.verification.*", QueryIntent::Read)
        .await
        .unwrap();
    assert!(decision.allowed);
}

#[tokio::test]
async fn test_wildcard_holder_is_bypass() {
    let boundary = Arc::new(FakeBoundary::new(None, AdminAttribution::default()));
    let gate = ScopedQueryGate::new(boundary);

    let user = user(&["super_admin"], &["*"], AttributeScope::default());

    let decision = gate
        .authorize_and_scope(&user, "gis.verification.update", QueryIntent::Write)
        .await
        .unwrap();
    assert!(decision.is_unfiltered());
}

// ==================== Kiểm tra bản ghi khi ghi ====================

#[tokio::test]
async fn test_record_in_scope_allows_write() {
    let boundary = Arc::new(FakeBoundary::new(None, attribution("Chiềng Khoong", "12")));
    let gate = ScopedQueryGate::new(boundary);

    let user = user(
        &["verifier"],
        &["gis.verification.update"],
        commune_scope("Chiềng Khoong"),
    );

    let result = gate
        .assert_record_in_scope(&user, Some(PointXy { x: 103.9, y: 21.3 }))
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_record_outside_scope_denied() {
    let boundary = Arc::new(FakeBoundary::new(None, attribution("Mường Bú", "9")));
    let gate = ScopedQueryGate::new(boundary);

    let user = user(
        &["verifier"],
        &["gis.verification.update"],
        commune_scope("Chiềng Khoong"),
    );

    let result = gate
        .assert_record_in_scope(&user, Some(PointXy { x: 103.9, y: 21.3 }))
        .await;
    assert!(matches!(result, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn test_attribution_lookup_failure_denies_write() {
    // Tra cứu lỗi/quá hạn → coi như không phân giải được → từ chối
    let boundary = Arc::new(FakeBoundary::failing());
    let gate = ScopedQueryGate::new(boundary);

    let user = user(
        &["verifier"],
        &["gis.verification.update"],
        commune_scope("Chiềng Khoong"),
    );

    let result = gate
        .assert_record_in_scope(&user, Some(PointXy { x: 103.9, y: 21.3 }))
        .await;
    assert!(matches!(result, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn test_record_without_geometry_denied() {
    let boundary = Arc::new(FakeBoundary::new(None, attribution("Chiềng Khoong", "12")));
    let gate = ScopedQueryGate::new(boundary);

    let user = user(
        &["verifier"],
        &["gis.verification.update"],
        commune_scope("Chiềng Khoong"),
    );

    let result = gate.assert_record_in_scope(&user, None).await;
    assert!(matches!(result, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn test_bypass_write_skips_record_check() {
    let boundary = Arc::new(FakeBoundary::failing());
    let gate = ScopedQueryGate::new(boundary.clone());

    let user = user(&["Admin"], &["*"], AttributeScope::default());

    // Bypass không cần tra cứu thuộc tính, kể cả khi lookup đang lỗi
    let result = gate.assert_record_in_scope(&user, None).await;
    assert!(result.is_ok());
    assert_eq!(boundary.attribution_calls.load(Ordering::SeqCst), 0);
}
