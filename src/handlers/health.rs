//! Handler kiểm tra sức khỏe
//! Cung cấp /health và /ready

use crate::{db, middleware::AppState};
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// Phản hồi thăm dò sống
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Phản hồi thăm dò sẵn sàng
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub checks: Vec<HealthCheck>,
}

/// Một mục kiểm tra
#[derive(Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

static APP_START_TIME: OnceLock<u64> = OnceLock::new();

/// Ghi lại thời điểm khởi động (gọi trong main)
pub fn set_start_time() {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let _ = APP_START_TIME.set(now);
}

/// Thời gian chạy (giây)
pub fn get_uptime() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    APP_START_TIME.get().map_or(0, |start| now - start)
}

/// Thăm dò sống — trả lời nhanh, không kiểm tra phụ thuộc
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: get_uptime(),
    })
}

/// Thăm dò sẵn sàng — kiểm tra cả hai CSDL
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> Json<ReadinessResponse> {
    let mut checks = Vec::new();
    let mut ready = true;

    db::record_pool_metrics("auth", &state.auth_db);
    db::record_pool_metrics("gis", &state.gis_db);

    for (name, pool) in [("auth_database", &state.auth_db), ("gis_database", &state.gis_db)] {
        match db::health_check(pool).await {
            db::HealthStatus::Healthy => checks.push(HealthCheck {
                name: name.to_string(),
                status: "ok".to_string(),
                message: None,
            }),
            db::HealthStatus::Unhealthy(msg) => {
                ready = false;
                checks.push(HealthCheck {
                    name: name.to_string(),
                    status: "failed".to_string(),
                    message: Some(msg),
                });
            }
        }
    }

    Json(ReadinessResponse { ready, checks })
}
