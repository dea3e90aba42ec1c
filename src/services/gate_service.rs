//! Cổng truy vấn theo phạm vi
//! Điểm chặn duy nhất cho mọi endpoint đọc/ghi bản ghi địa lý. Thứ tự
//! quyết định: quyền → vai trò miễn lọc → không phạm vi (ngắn mạch về
//! rỗng TRƯỚC khi chạm truy vấn không gian) → predicate thu hẹp.
//! Thao tác ghi còn phải kiểm tra lại bản ghi cụ thể nằm trong phạm vi
//! trước khi cập nhật.

use crate::{
    error::AppError,
    models::{NormalizedScope, PointXy, QueryIntent, ScopeDecision},
    repository::BoundaryLookup,
    services::rbac_service::ResolvedUser,
    services::scope_service::{attribution_matches, resolve_user_scope},
};
use std::sync::Arc;

pub struct ScopedQueryGate {
    boundary: Arc<dyn BoundaryLookup>,
}

impl ScopedQueryGate {
    pub fn new(boundary: Arc<dyn BoundaryLookup>) -> Self {
        Self { boundary }
    }

    /// Cho phép thao tác và tính predicate thu hẹp cho truy vấn phía sau.
    /// Gọi giống hệt nhau cho đọc (danh sách/tìm kiếm) và ghi (xác minh).
    pub async fn authorize_and_scope(
        &self,
        user: &ResolvedUser,
        required_permission: &str,
        intent: QueryIntent,
    ) -> Result<ScopeDecision, AppError> {
        // (1) Quyền trước, sai thì dừng ngay
        let granted = if required_permission.contains('*') {
            user.permissions.matches_pattern(required_permission)?
        } else {
            user.permissions.has(required_permission)
        };

        if !granted {
            metrics::counter!("rbac.permission.denied").increment(1);
            tracing::warn!(
                user_id = user.user_id,
                username = %user.username,
                required = required_permission,
                "Scoped query rejected: missing permission"
            );
            return Err(AppError::Forbidden);
        }

        match resolve_user_scope(&user.roles, &user.attribute_scope, &user.data_scopes) {
            // (2) Vai trò miễn lọc: không predicate nào
            NormalizedScope::Bypass => Ok(ScopeDecision::bypass()),

            // (3) Không phạm vi: kết quả rỗng, quyết định trước khi tốn
            // bất kỳ truy vấn không gian nào
            NormalizedScope::Unscoped => {
                metrics::counter!("rbac.scope.empty_result").increment(1);
                tracing::info!(
                    user_id = user.user_id,
                    username = %user.username,
                    "Restricted user without scope assignment, returning empty result"
                );
                Ok(ScopeDecision::empty())
            }

            // (4) Predicate thu hẹp; với truy vấn đọc hàng loạt, tính trước
            // hợp hình học phạm vi để lọc bằng một phép giao duy nhất
            NormalizedScope::Restricted(predicate) => {
                let spatial = match intent {
                    QueryIntent::Read => {
                        match self.boundary.scope_union_geometry(&predicate).await {
                            Ok(geometry) => geometry,
                            Err(err) => {
                                // Predicate thuộc tính vẫn được áp qua INNER
                                // join — lỗi ở đây thu hẹp chứ không mở rộng
                                tracing::warn!(
                                    error = %err,
                                    "Scope union geometry unavailable, \
                                     falling back to attribute predicate"
                                );
                                None
                            }
                        }
                    }
                    QueryIntent::Write => None,
                };

                Ok(ScopeDecision::restricted(predicate, spatial))
            }
        }
    }

    /// Kiểm tra một bản ghi cụ thể nằm trong phạm vi — bắt buộc trên đường
    /// ghi, ngay trước khi commit mutation. Thuộc tính không phân giải được
    /// (kể cả do lỗi/quá hạn tra cứu) → từ chối.
    pub async fn assert_record_in_scope(
        &self,
        user: &ResolvedUser,
        centroid: Option<PointXy>,
    ) -> Result<(), AppError> {
        match resolve_user_scope(&user.roles, &user.attribute_scope, &user.data_scopes) {
            NormalizedScope::Bypass => Ok(()),
            NormalizedScope::Unscoped => Err(AppError::Forbidden),
            NormalizedScope::Restricted(predicate) => {
                let Some(point) = centroid else {
                    // Bản ghi không có hình học thì không chứng minh được
                    // là trong phạm vi
                    return Err(AppError::Forbidden);
                };

                let attribution = match self.boundary.resolve_attribution(&[point]).await {
                    Ok(mut resolved) => resolved.pop().unwrap_or_default(),
                    Err(err) => {
                        tracing::warn!(
                            user_id = user.user_id,
                            error = %err,
                            "Attribution lookup failed during write check, denying"
                        );
                        return Err(AppError::Forbidden);
                    }
                };

                if attribution_matches(&attribution, &predicate) {
                    Ok(())
                } else {
                    tracing::warn!(
                        user_id = user.user_id,
                        username = %user.username,
                        "Record outside user scope, write denied"
                    );
                    Err(AppError::Forbidden)
                }
            }
        }
    }
}
