//! Đăng ký route
//! Ba nhóm: công khai (health), /api/v1 sau middleware định danh gateway,
//! /internal sau middleware khóa nội bộ

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::{handlers, middleware::AppState};

/// Tạo router của ứng dụng
pub fn create_router(state: Arc<AppState>) -> Router {
    // Endpoint công khai (kiểm tra sức khỏe)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    // Route nghiệp vụ — bắt buộc định danh từ gateway
    let api_routes = Router::new()
        // Quản lý vai trò
        .route(
            "/api/v1/roles",
            get(handlers::role::list_roles).post(handlers::role::create_role),
        )
        .route(
            "/api/v1/roles/{id}",
            get(handlers::role::get_role)
                .put(handlers::role::update_role)
                .delete(handlers::role::delete_role),
        )
        .route(
            "/api/v1/roles/{id}/permissions",
            put(handlers::role::sync_role_permissions),
        )

        // Danh mục quyền
        .route("/api/v1/permissions", get(handlers::permission::list_permissions))
        .route("/api/v1/permissions/tree", get(handlers::permission::permission_tree))
        .route(
            "/api/v1/permissions/validate",
            post(handlers::permission::validate_codes),
        )

        // Cây phạm vi dữ liệu
        .route("/api/v1/datascopes", get(handlers::scope::list_data_scopes))
        .route(
            "/api/v1/datascopes/{code}/access",
            get(handlers::scope::check_scope_access),
        )

        // Người dùng: vai trò và phạm vi
        .route(
            "/api/v1/users/{id}/permissions",
            get(handlers::user::get_user_permissions),
        )
        .route("/api/v1/users/{id}/roles", post(handlers::user::assign_role))
        .route(
            "/api/v1/users/{id}/roles/{role_id}",
            axum::routing::delete(handlers::user::remove_role),
        )
        .route("/api/v1/users/{id}/scope", put(handlers::user::set_user_scope))

        // Dữ liệu mất rừng (đi qua cổng phạm vi)
        .route("/api/v1/matrung", get(handlers::matrung::list_matrung))
        .route("/api/v1/matrung/{gid}", get(handlers::matrung::get_matrung))
        .route(
            "/api/v1/matrung/{gid}/verify",
            post(handlers::matrung::verify_matrung),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::auth::middleware::gateway_identity_middleware,
        ));

    // Endpoint nội bộ giữa các service — khóa chia sẻ riêng
    let internal_routes = Router::new()
        .route(
            "/internal/users/{user_id}/permissions",
            get(handlers::internal::get_user_permissions),
        )
        .route(
            "/internal/users/{user_id}/roles",
            get(handlers::internal::get_user_roles),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::auth::middleware::internal_api_key_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(internal_routes)
        .layer(axum::middleware::from_fn(
            crate::middleware::request_tracking_middleware,
        ))
        // GeoJSON của cả một vùng nén rất tốt
        .layer(tower_http::compression::CompressionLayer::new())
        .with_state(state)
}
