//! Model phạm vi dữ liệu
//! Hai cách biểu diễn phạm vi cùng tồn tại: thuộc tính kiểu cũ
//! (xã/tiểu khu/khoảnh trên bản ghi người dùng) và cây DataScope
//! (đường dẫn vật chất hóa). Cả hai được quy về một predicate duy nhất.

use serde::{Deserialize, Serialize};

/// Cấp đơn vị hành chính/lâm nghiệp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeKind {
    Country,
    Province,
    District,
    Commune,
    Subcompartment,
    Compartment,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Country => "COUNTRY",
            ScopeKind::Province => "PROVINCE",
            ScopeKind::District => "DISTRICT",
            ScopeKind::Commune => "COMMUNE",
            ScopeKind::Subcompartment => "SUBCOMPARTMENT",
            ScopeKind::Compartment => "COMPARTMENT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "COUNTRY" => Some(ScopeKind::Country),
            "PROVINCE" => Some(ScopeKind::Province),
            "DISTRICT" => Some(ScopeKind::District),
            "COMMUNE" => Some(ScopeKind::Commune),
            "SUBCOMPARTMENT" => Some(ScopeKind::Subcompartment),
            "COMPARTMENT" => Some(ScopeKind::Compartment),
            _ => None,
        }
    }
}

/// Một nút trong cây phạm vi.
/// `path` là chuỗi mã tổ tiên nối bằng `/` (ví dụ "/VN/LC/BT");
/// nút cha bao trùm mọi nút con theo prefix của path.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DataScope {
    pub id: i32,
    pub kind: String,
    pub code: String,
    pub name: String,
    pub parent_id: Option<i32>,
    pub path: String,
    pub level: i32,
    pub is_active: bool,
}

impl DataScope {
    /// Nút này có bao trùm mã phạm vi kia không (bằng hoặc là con cháu)
    pub fn subsumes_code(&self, code: &str) -> bool {
        self.code == code || self.path.starts_with(&format!("/{code}"))
    }
}

/// Phạm vi thuộc tính kiểu cũ trên bản ghi người dùng.
/// Trường vắng nghĩa là "không ràng buộc ở cấp đó".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeScope {
    pub xa: Option<String>,
    pub tieukhu: Option<String>,
    pub khoanh: Option<String>,
}

impl AttributeScope {
    pub fn is_empty(&self) -> bool {
        self.xa.is_none() && self.tieukhu.is_none() && self.khoanh.is_none()
    }
}

/// Thuộc tính hành chính của một lô, suy ra bằng truy vấn không gian.
/// Trường None nghĩa là không phân giải được ở cấp đó.
#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct AdminAttribution {
    pub huyen: Option<String>,
    pub xa: Option<String>,
    pub tk: Option<String>,
    pub khoanh: Option<String>,
}

impl AdminAttribution {
    pub fn is_unresolved(&self) -> bool {
        self.huyen.is_none() && self.xa.is_none() && self.tk.is_none() && self.khoanh.is_none()
    }
}

/// Predicate phạm vi đã chuẩn hóa, áp vào truy vấn dữ liệu
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttributePredicate {
    pub huyen: Option<String>,
    pub xa: Option<String>,
    pub tk: Option<String>,
    pub khoanh: Option<String>,
}

impl AttributePredicate {
    pub fn is_empty(&self) -> bool {
        self.huyen.is_none() && self.xa.is_none() && self.tk.is_none() && self.khoanh.is_none()
    }
}

/// Kết quả quy hai cách biểu diễn phạm vi về một mối
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedScope {
    /// Vai trò trong danh sách miễn lọc — thấy toàn bộ
    Bypass,
    /// Không có phạm vi nào — kết quả rỗng, không bao giờ mở toàn bộ
    Unscoped,
    /// Bị giới hạn theo predicate
    Restricted(AttributePredicate),
}

/// Ý định truy vấn đi qua cổng phạm vi
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryIntent {
    Read,
    Write,
}

/// Quyết định của cổng phạm vi cho một thao tác
#[derive(Debug, Clone)]
pub struct ScopeDecision {
    pub allowed: bool,
    /// true: truy vấn ngắn mạch về rỗng, không chạm CSDL dữ liệu
    pub empty_result: bool,
    pub attribute_predicate: Option<AttributePredicate>,
    /// Hình học GeoJSON của hợp các ranh giới trong phạm vi (nếu tính trước được)
    pub spatial_predicate: Option<String>,
}

impl ScopeDecision {
    /// Vai trò miễn lọc: không predicate nào cả
    pub fn bypass() -> Self {
        Self {
            allowed: true,
            empty_result: false,
            attribute_predicate: None,
            spatial_predicate: None,
        }
    }

    /// Người dùng không có phạm vi: cho phép nhưng kết quả rỗng
    pub fn empty() -> Self {
        Self {
            allowed: true,
            empty_result: true,
            attribute_predicate: None,
            spatial_predicate: None,
        }
    }

    pub fn restricted(predicate: AttributePredicate, spatial: Option<String>) -> Self {
        Self {
            allowed: true,
            empty_result: false,
            attribute_predicate: Some(predicate),
            spatial_predicate: spatial,
        }
    }

    pub fn is_unfiltered(&self) -> bool {
        !self.empty_result
            && self.attribute_predicate.is_none()
            && self.spatial_predicate.is_none()
    }
}

/// Điểm tọa độ (EPSG:4326)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointXy {
    pub x: f64,
    pub y: f64,
}

/// Yêu cầu gán phạm vi thuộc tính cho người dùng
#[derive(Debug, Deserialize)]
pub struct SetUserScopeRequest {
    pub xa: Option<String>,
    pub tieukhu: Option<String>,
    pub khoanh: Option<String>,
}
