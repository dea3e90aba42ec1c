//! Ngữ cảnh định danh từ API gateway
//! Gateway xác thực JWT rồi chuyển định danh xuống qua các header
//! `x-user-*` (URL-encode vì giá trị tiếng Việt có dấu). Service này
//! không tự suy lại định danh — header vắng nghĩa là "không đặt",
//! không phải chuỗi rỗng.

use crate::error::AppError;
use crate::models::AttributeScope;
use axum::{extract::FromRequestParts, http::HeaderMap};
use percent_encoding::percent_decode_str;

pub const HEADER_USER_ID: &str = "x-user-id";
pub const HEADER_USERNAME: &str = "x-user-username";
pub const HEADER_ROLES: &str = "x-user-roles";
pub const HEADER_PERMISSIONS: &str = "x-user-permissions";
pub const HEADER_XA: &str = "x-user-xa";
pub const HEADER_TIEUKHU: &str = "x-user-tieukhu";
pub const HEADER_KHOANH: &str = "x-user-khoanh";

/// Định danh đã phân giải của request hiện tại
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: i32,
    pub username: String,
    /// Tên vai trò, gateway nối bằng dấu phẩy
    pub roles: Vec<String>,
    /// Tập quyền gateway tính sẵn (tùy chọn, resolver vẫn là nguồn chuẩn)
    pub permissions: Option<Vec<String>>,
    /// Phạm vi thuộc tính kiểu cũ gắn trên người dùng
    pub scope: AttributeScope,
}

impl Identity {
    /// Dựng định danh từ header do gateway chuyển xuống
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        let user_id = decoded_header(headers, HEADER_USER_ID)
            .ok_or(AppError::Unauthorized)?
            .parse::<i32>()
            .map_err(|_| AppError::Unauthorized)?;

        let username = decoded_header(headers, HEADER_USERNAME).ok_or(AppError::Unauthorized)?;

        let roles = decoded_header(headers, HEADER_ROLES)
            .map(|s| split_csv(&s))
            .unwrap_or_default();

        let permissions = decoded_header(headers, HEADER_PERMISSIONS).map(|s| split_csv(&s));

        let scope = AttributeScope {
            xa: decoded_header(headers, HEADER_XA),
            tieukhu: decoded_header(headers, HEADER_TIEUKHU),
            khoanh: decoded_header(headers, HEADER_KHOANH),
        };

        Ok(Self {
            user_id,
            username,
            roles,
            permissions,
            scope,
        })
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r == name)
    }
}

/// Đọc một header và URL-decode; header vắng hoặc rỗng đều là None
fn decoded_header(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(name)?.to_str().ok()?;
    if raw.is_empty() {
        return None;
    }

    let decoded = percent_decode_str(raw).decode_utf8().ok()?.to_string();
    if decoded.is_empty() {
        None
    } else {
        Some(decoded)
    }
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

// FromRequestParts để handler trích Identity trực tiếp
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(
                axum::http::HeaderName::from_bytes(k.as_bytes()).unwrap(),
                v.parse().unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_identity_from_headers() {
        let map = headers(&[
            (HEADER_USER_ID, "42"),
            (HEADER_USERNAME, "kiemlam_sk"),
            (HEADER_ROLES, "verifier%2CLanhDao"),
            (HEADER_XA, "Chi%E1%BB%81ng%20Khoong"),
        ]);

        let identity = Identity::from_headers(&map).unwrap();
        assert_eq!(identity.user_id, 42);
        assert_eq!(identity.username, "kiemlam_sk");
        assert_eq!(identity.roles, vec!["verifier", "LanhDao"]);
        assert_eq!(identity.scope.xa.as_deref(), Some("Chiềng Khoong"));
        assert!(identity.scope.tieukhu.is_none());
        assert!(identity.permissions.is_none());
    }

    #[test]
    fn test_missing_user_id_is_unauthorized() {
        let map = headers(&[(HEADER_USERNAME, "ai_do")]);
        assert!(matches!(
            Identity::from_headers(&map),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_empty_header_means_not_set() {
        // Gateway gửi chuỗi rỗng khi người dùng không có phạm vi
        let map = headers(&[
            (HEADER_USER_ID, "7"),
            (HEADER_USERNAME, "user7"),
            (HEADER_XA, ""),
            (HEADER_TIEUKHU, ""),
        ]);

        let identity = Identity::from_headers(&map).unwrap();
        assert!(identity.scope.is_empty());
    }

    #[test]
    fn test_non_numeric_user_id_rejected() {
        let map = headers(&[(HEADER_USER_ID, "abc"), (HEADER_USERNAME, "x")]);
        assert!(matches!(
            Identity::from_headers(&map),
            Err(AppError::Unauthorized)
        ));
    }
}
