//! Handler dữ liệu mất rừng
//! Mọi thao tác đọc/ghi đều đi qua cổng phạm vi; người dùng bị giới hạn
//! không có phạm vi nhận phản hồi rỗng thành công kèm hướng dẫn, không
//! phải lỗi — tránh lộ sự tồn tại của dữ liệu qua kênh lỗi.

use crate::{
    auth::identity::Identity,
    error::AppError,
    middleware::AppState,
    models::{
        AdminAttribution, MatRungFeature, MatRungFeatureDto, MatRungQuery, QueryIntent,
        VerifyMatRungRequest,
    },
    repository::MatRungRepository,
    services::scope_service::attribution_matches,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

/// Thông điệp cho người dùng bị giới hạn chưa được gán khu vực
const NO_SCOPE_MESSAGE: &str =
    "Không có dữ liệu trong phạm vi được phân công — liên hệ quản trị viên để được gán khu vực";

/// Danh sách lô mất rừng trong phạm vi của người dùng
pub async fn list_matrung(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Query(mut query): Query<MatRungQuery>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.rbac_service.resolve_user(&identity).await?;
    let decision = state
        .gate
        .authorize_and_scope(&user, "gis.matrung.view", QueryIntent::Read)
        .await?;

    // Người dùng bị giới hạn chưa có phạm vi: phản hồi rỗng thành công,
    // không chạm CSDL GIS
    if decision.empty_result {
        return Ok(Json(json!({
            "success": true,
            "message": NO_SCOPE_MESSAGE,
            "data": empty_feature_collection(),
        })));
    }

    let restricted = decision.attribute_predicate.is_some();

    // Khoảng thời gian: người dùng bị giới hạn không chọn ngày thì mặc định
    // 12 tháng; người dùng tự do phải chọn đủ hai mốc khi đã lọc
    if query.from_date.is_none() || query.to_date.is_none() {
        let has_other_filters = query.huyen.is_some()
            || query.xa.is_some()
            || query.tk.is_some()
            || query.khoanh.is_some()
            || query.churung.is_some();

        if restricted || !has_other_filters {
            let today = Utc::now().date_naive();
            query.to_date = Some(today);
            query.from_date = Some(today - Duration::days(365));
        } else {
            return Err(AppError::Validation(
                "from_date and to_date are required for filtered search".to_string(),
            ));
        }
    }

    tracing::info!(
        user_id = user.user_id,
        restricted,
        from_date = ?query.from_date,
        to_date = ?query.to_date,
        "Loading mat rung data"
    );

    let repo = MatRungRepository::new(state.gis_db.clone());
    let features = repo.list(&query, &decision).await?;

    let collection = feature_collection(&features);
    let count = features.len();

    Ok(Json(json!({
        "success": true,
        "message": format!("Đã tải {count} lô mất rừng"),
        "data": collection,
    })))
}

/// Một lô theo mã
pub async fn get_matrung(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(gid): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.rbac_service.resolve_user(&identity).await?;
    let decision = state
        .gate
        .authorize_and_scope(&user, "gis.matrung.view", QueryIntent::Read)
        .await?;

    if decision.empty_result {
        // Không lộ sự tồn tại của lô ngoài phạm vi
        return Err(AppError::NotFound);
    }

    let repo = MatRungRepository::new(state.gis_db.clone());
    let feature = repo.find_by_gid(gid).await?.ok_or(AppError::NotFound)?;

    if let Some(predicate) = &decision.attribute_predicate {
        let attribution = AdminAttribution {
            huyen: feature.huyen.clone(),
            xa: feature.xa.clone(),
            tk: feature.tk.clone(),
            khoanh: feature.khoanh.clone(),
        };
        if !attribution_matches(&attribution, predicate) {
            return Err(AppError::NotFound);
        }
    }

    Ok(Json(json!({
        "success": true,
        "data": to_geojson_feature(&feature),
    })))
}

/// Xác minh một lô — ghi có kiểm tra lại phạm vi trên chính bản ghi
pub async fn verify_matrung(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(gid): Path<i32>,
    Json(req): Json<VerifyMatRungRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    if let Some(area) = req.verified_area {
        if !area.is_finite() || area < 0.0 {
            return Err(AppError::Validation(
                "Diện tích thực tế phải là số hợp lệ và không âm".to_string(),
            ));
        }
    }

    let user = state.rbac_service.resolve_user(&identity).await?;
    let decision = state
        .gate
        .authorize_and_scope(&user, "gis.verification.update", QueryIntent::Write)
        .await?;

    // Ghi thì không có "kết quả rỗng" — không phạm vi là không được ghi
    if decision.empty_result {
        return Err(AppError::Forbidden);
    }

    let repo = MatRungRepository::new(state.gis_db.clone());
    let (area, current_verified_area) = repo
        .verification_state(gid)
        .await?
        .ok_or(AppError::NotFound)?;

    // Bản ghi cụ thể phải nằm trong phạm vi, kiểm tra ngay trước mutation
    let centroid = repo.centroid(gid).await?;
    state.gate.assert_record_in_scope(&user, centroid).await?;

    // Không nhập diện tích thì giữ giá trị hiện có, chưa có thì lấy
    // diện tích gốc
    let final_area = req.verified_area.or(current_verified_area).or(area);

    // Không nhập ngày thì lấy ngày hiện tại
    let detection_date = req
        .detection_date
        .unwrap_or_else(|| Utc::now().date_naive());

    let updated = repo
        .apply_verification(
            gid,
            &req.verification_reason,
            final_area,
            req.verification_notes.as_deref(),
            detection_date,
            user.user_id,
        )
        .await?;

    if !updated {
        return Err(AppError::NotFound);
    }

    tracing::info!(
        gid,
        user_id = user.user_id,
        username = %user.username,
        "Mat rung feature verified"
    );

    Ok(Json(json!({
        "success": true,
        "message": format!("Xác minh lô CB-{gid} thành công"),
    })))
}

fn empty_feature_collection() -> serde_json::Value {
    json!({
        "type": "FeatureCollection",
        "features": []
    })
}

fn to_geojson_feature(feature: &MatRungFeature) -> serde_json::Value {
    let geometry: serde_json::Value = feature
        .geometry
        .as_deref()
        .and_then(|g| serde_json::from_str(g).ok())
        .unwrap_or(serde_json::Value::Null);

    json!({
        "type": "Feature",
        "geometry": geometry,
        "properties": MatRungFeatureDto::from(feature),
    })
}

fn feature_collection(features: &[MatRungFeature]) -> serde_json::Value {
    json!({
        "type": "FeatureCollection",
        "features": features.iter().map(to_geojson_feature).collect::<Vec<_>>(),
    })
}
