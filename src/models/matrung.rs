//! Model lô mất rừng (CSDL GIS)
//! Thuộc tính hành chính của lô không lưu sẵn mà suy ra bằng
//! giao cắt không gian với lớp ranh giới tại thời điểm truy vấn.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Một lô mất rừng kèm thuộc tính hành chính đã phân giải
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MatRungFeature {
    pub gid: i32,
    pub start_dau: Option<String>,
    pub end_sau: Option<String>,
    pub mahuyen: Option<String>,
    pub area: Option<f64>,
    /// Diện tích tính từ geometry (m2), không tin field area gốc
    pub dtich: Option<f64>,
    pub detection_status: Option<String>,
    pub detection_date: Option<NaiveDate>,
    pub verified_by: Option<i32>,
    pub verified_area: Option<f64>,
    pub verification_reason: Option<String>,
    pub verification_notes: Option<String>,
    // Thuộc tính hành chính từ giao cắt không gian
    pub huyen: Option<String>,
    pub xa: Option<String>,
    pub tk: Option<String>,
    pub khoanh: Option<String>,
    // Tọa độ centroid (EPSG:4326)
    pub x: Option<f64>,
    pub y: Option<f64>,
    /// Geometry dạng GeoJSON
    pub geometry: Option<String>,
}

/// Tham số lọc danh sách lô mất rừng
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatRungQuery {
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub huyen: Option<String>,
    pub xa: Option<String>,
    pub tk: Option<String>,
    pub khoanh: Option<String>,
    pub churung: Option<String>,
    pub limit: Option<i64>,
}

/// Yêu cầu xác minh một lô
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyMatRungRequest {
    #[validate(length(min = 1))]
    pub verification_reason: String,
    /// Không gửi thì giữ giá trị hiện tại (hoặc diện tích gốc)
    pub verified_area: Option<f64>,
    pub verification_notes: Option<String>,
    /// Không gửi thì lấy ngày hiện tại
    pub detection_date: Option<NaiveDate>,
}

/// Trạng thái sau khi xác minh
pub const STATUS_VERIFIED: &str = "Đã xác minh";

/// Mã huyện của tỉnh Lào Cai
pub const HUYEN_MAPPING: &[(&str, &str)] = &[
    ("01", "Lào Cai"),
    ("02", "Bát Xát"),
    ("03", "Mường Khương"),
    ("04", "Si Ma Cai"),
    ("05", "Bắc Hà"),
    ("06", "Bảo Thắng"),
    ("07", "Bảo Yên"),
    ("08", "Sa Pa"),
    ("09", "Văn Bàn"),
];

/// Tra tên huyện theo mã
pub fn huyen_name(code: &str) -> Option<&'static str> {
    HUYEN_MAPPING
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// Một feature GeoJSON trả về cho client
#[derive(Debug, Serialize)]
pub struct MatRungFeatureDto {
    pub gid: i32,
    pub start_dau: Option<String>,
    pub end_sau: Option<String>,
    pub mahuyen: Option<String>,
    pub huyen_name: Option<String>,
    pub dtich: Option<f64>,
    pub detection_status: Option<String>,
    pub detection_date: Option<NaiveDate>,
    pub verified_by: Option<i32>,
    pub verified_area: Option<f64>,
    pub verification_reason: Option<String>,
    pub verification_notes: Option<String>,
    pub huyen: Option<String>,
    pub xa: Option<String>,
    pub tk: Option<String>,
    pub khoanh: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

impl From<&MatRungFeature> for MatRungFeatureDto {
    fn from(f: &MatRungFeature) -> Self {
        Self {
            gid: f.gid,
            start_dau: f.start_dau.clone(),
            end_sau: f.end_sau.clone(),
            mahuyen: f.mahuyen.clone(),
            huyen_name: f.mahuyen.as_deref().and_then(huyen_name).map(String::from),
            dtich: f.dtich,
            detection_status: f.detection_status.clone(),
            detection_date: f.detection_date,
            verified_by: f.verified_by,
            verified_area: f.verified_area,
            verification_reason: f.verification_reason.clone(),
            verification_notes: f.verification_notes.clone(),
            huyen: f.huyen.clone(),
            xa: f.xa.clone(),
            tk: f.tk.clone(),
            khoanh: f.khoanh.clone(),
            x: f.x,
            y: f.y,
        }
    }
}
