//! Danh mục quyền (catalog)
//! Mã quyền chuẩn dạng `module.resource.action`, seed idempotent vào CSDL.
//! Các mã kiểu cũ (`page.key`, mã phẳng) chỉ được chấp nhận qua bảng
//! chuyển đổi tường minh — mã lạ bị từ chối, không đoán.

use crate::error::AppError;
use once_cell::sync::Lazy;

/// Quyền đại diện toàn bộ hệ thống, chỉ gán cho vai trò super admin
pub const WILDCARD: &str = "*";

/// Tên vai trò super admin — bất biến, không bao giờ cho sửa quyền
pub const SUPER_ADMIN_ROLE: &str = "super_admin";

/// Định nghĩa một quyền trong danh mục
#[derive(Debug, Clone)]
pub struct PermissionDef {
    pub code: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

impl PermissionDef {
    /// Tách mã thành (module, resource, action)
    pub fn parts(&self) -> Result<PermissionCode, AppError> {
        PermissionCode::parse(self.code)
    }
}

/// Mã quyền đã phân tách
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionCode {
    pub module: String,
    pub resource: String,
    pub action: String,
}

impl PermissionCode {
    /// Phân tách mã quyền chuẩn: đúng ba đoạn, phân biệt hoa thường,
    /// không đoạn nào rỗng. Wildcard `*` không phân tách được.
    pub fn parse(code: &str) -> Result<Self, AppError> {
        let segments: Vec<&str> = code.split('.').collect();

        if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
            return Err(AppError::Validation(format!(
                "Invalid permission code '{code}': expected module.resource.action"
            )));
        }

        Ok(Self {
            module: segments[0].to_string(),
            resource: segments[1].to_string(),
            action: segments[2].to_string(),
        })
    }
}

/// Bảng chuyển đổi mã kiểu cũ sang mã chuẩn.
/// Dữ liệu cũ tồn tại song song hai quy ước (`page.key` và mã phẳng);
/// chỉ những mã liệt kê ở đây được chấp nhận khi seed.
pub const LEGACY_CODE_MAP: &[(&str, &str)] = &[
    ("dashboard.view", "dashboard.dashboard.view"),
    ("forecast.auto", "forecast.auto.execute"),
    ("forecast.custom", "forecast.custom.execute"),
    ("data_management.forecast_search", "data_management.forecast.search"),
    ("data_management.satellite_search", "data_management.satellite.search"),
    ("data_management.verification", "gis.verification.update"),
    ("data_management.data_update", "data_management.data.update"),
    ("reports.view", "report.report.view"),
];

/// Chuẩn hóa một mã quyền: mã chuẩn giữ nguyên, mã cũ tra bảng,
/// còn lại là lỗi Validation (bị gắn cờ, không đoán)
pub fn normalize_code(code: &str) -> Result<String, AppError> {
    if code == WILDCARD {
        return Ok(code.to_string());
    }

    if PermissionCode::parse(code).is_ok() {
        return Ok(code.to_string());
    }

    if let Some((_, canonical)) = LEGACY_CODE_MAP.iter().find(|(legacy, _)| *legacy == code) {
        return Ok((*canonical).to_string());
    }

    Err(AppError::Validation(format!(
        "Unrecognized permission code '{code}': neither canonical nor a known legacy code"
    )))
}

/// Danh mục quyền tích hợp sẵn
pub static BUILTIN_PERMISSIONS: Lazy<Vec<PermissionDef>> = Lazy::new(|| {
    vec![
        // GIS — dữ liệu mất rừng và xác minh
        PermissionDef {
            code: "gis.matrung.view",
            name: "Xem dữ liệu mất rừng",
            description: "Xem danh sách và bản đồ các lô mất rừng trong phạm vi được gán",
        },
        PermissionDef {
            code: "gis.matrung.search",
            name: "Tra cứu lô mất rừng",
            description: "Tìm kiếm lô mất rừng theo mã lô và khu vực lân cận",
        },
        PermissionDef {
            code: "gis.verification.view",
            name: "Xem kết quả xác minh",
            description: "Xem trạng thái và lịch sử xác minh các lô mất rừng",
        },
        PermissionDef {
            code: "gis.verification.update",
            name: "Xác minh lô mất rừng",
            description: "Cập nhật kết quả xác minh thực địa cho lô mất rừng trong phạm vi",
        },
        PermissionDef {
            code: "gis.layer.view",
            name: "Xem lớp bản đồ",
            description: "Xem các lớp ranh giới hành chính và hiện trạng rừng",
        },
        // Dự báo
        PermissionDef {
            code: "forecast.auto.execute",
            name: "Dự báo mất rừng tự động",
            description: "Chạy dự báo tự động các khu vực có nguy cơ mất rừng",
        },
        PermissionDef {
            code: "forecast.custom.execute",
            name: "Dự báo mất rừng tùy biến",
            description: "Tùy chỉnh tham số dự báo theo nhu cầu cụ thể",
        },
        // Quản lý dữ liệu
        PermissionDef {
            code: "data_management.forecast.search",
            name: "Tra cứu dữ liệu dự báo",
            description: "Tra cứu và tải xuống dữ liệu dự báo mất rừng",
        },
        PermissionDef {
            code: "data_management.satellite.search",
            name: "Tra cứu ảnh vệ tinh",
            description: "Tra cứu ảnh vệ tinh theo khu vực và thời gian",
        },
        PermissionDef {
            code: "data_management.data.update",
            name: "Cập nhật dữ liệu",
            description: "Cập nhật thuộc tính dữ liệu mất rừng",
        },
        // Báo cáo
        PermissionDef {
            code: "report.report.view",
            name: "Xem báo cáo",
            description: "Xem báo cáo thống kê mất rừng",
        },
        PermissionDef {
            code: "report.report.export",
            name: "Xuất báo cáo",
            description: "Xuất báo cáo ra tệp",
        },
        // Quản lý người dùng
        PermissionDef {
            code: "user.user.view",
            name: "Xem người dùng",
            description: "Xem danh sách người dùng",
        },
        PermissionDef {
            code: "user.user.create",
            name: "Tạo người dùng",
            description: "Tạo tài khoản người dùng mới",
        },
        PermissionDef {
            code: "user.user.update",
            name: "Sửa người dùng",
            description: "Cập nhật thông tin người dùng",
        },
        PermissionDef {
            code: "user.user.delete",
            name: "Xóa người dùng",
            description: "Xóa tài khoản người dùng",
        },
        PermissionDef {
            code: "user.role.assign",
            name: "Gán vai trò",
            description: "Gán hoặc thu hồi vai trò của người dùng",
        },
        PermissionDef {
            code: "user.scope.assign",
            name: "Gán phạm vi dữ liệu",
            description: "Gán xã/tiểu khu/khoảnh cho người dùng",
        },
        // Quản lý vai trò
        PermissionDef {
            code: "role.role.view",
            name: "Xem vai trò",
            description: "Xem danh sách vai trò và quyền",
        },
        PermissionDef {
            code: "role.role.create",
            name: "Tạo vai trò",
            description: "Tạo vai trò mới",
        },
        PermissionDef {
            code: "role.role.update",
            name: "Sửa vai trò",
            description: "Cập nhật thông tin vai trò",
        },
        PermissionDef {
            code: "role.role.delete",
            name: "Xóa vai trò",
            description: "Xóa vai trò không còn người dùng",
        },
        PermissionDef {
            code: "role.permission.sync",
            name: "Đồng bộ quyền vai trò",
            description: "Thay toàn bộ tập quyền của một vai trò",
        },
        // Quản trị phạm vi
        PermissionDef {
            code: "admin.datascope.view",
            name: "Xem cây phạm vi",
            description: "Xem cây đơn vị hành chính/lâm nghiệp",
        },
        PermissionDef {
            code: "admin.datascope.manage",
            name: "Quản lý phạm vi",
            description: "Gán phạm vi dữ liệu cho vai trò",
        },
        // Bảng điều khiển
        PermissionDef {
            code: "dashboard.dashboard.view",
            name: "Xem bảng điều khiển",
            description: "Trang tổng quan hệ thống",
        },
    ]
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_code() {
        let code = PermissionCode::parse("user.user.view").unwrap();
        assert_eq!(code.module, "user");
        assert_eq!(code.resource, "user");
        assert_eq!(code.action, "view");
    }

    #[test]
    fn test_parse_rejects_two_segments() {
        assert!(PermissionCode::parse("dashboard.view").is_err());
        assert!(PermissionCode::parse("view").is_err());
        assert!(PermissionCode::parse("a.b.c.d").is_err());
        assert!(PermissionCode::parse("a..c").is_err());
    }

    #[test]
    fn test_normalize_legacy_codes() {
        assert_eq!(
            normalize_code("dashboard.view").unwrap(),
            "dashboard.dashboard.view"
        );
        assert_eq!(
            normalize_code("forecast.auto").unwrap(),
            "forecast.auto.execute"
        );
        // Mã chuẩn giữ nguyên
        assert_eq!(normalize_code("user.user.view").unwrap(), "user.user.view");
        assert_eq!(normalize_code(WILDCARD).unwrap(), "*");
    }

    #[test]
    fn test_normalize_rejects_unknown_legacy() {
        assert!(normalize_code("mystery.page").is_err());
        assert!(normalize_code("").is_err());
    }

    #[test]
    fn test_builtin_catalog_is_canonical_and_unique() {
        let mut seen = std::collections::HashSet::new();
        for def in BUILTIN_PERMISSIONS.iter() {
            assert!(def.parts().is_ok(), "non-canonical code {}", def.code);
            assert!(seen.insert(def.code), "duplicate code {}", def.code);
        }
    }
}
