//! Đánh giá quyền
//! Hàm thuần trên tập quyền đã phân giải — không truy cập CSDL.
//! Việc trả 401/403 thuộc về middleware/handler gọi nó.

use crate::catalog::WILDCARD;
use crate::error::AppError;
use regex::Regex;
use std::collections::HashSet;

/// Chế độ kiểm tra quyền
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequireMode {
    /// Có ít nhất một quyền trong danh sách
    Any,
    /// Có đủ mọi quyền trong danh sách
    All,
    /// Khớp pattern có wildcard (chỉ dùng phần tử đầu)
    Pattern,
}

/// Tập quyền đã phân giải của một người dùng
#[derive(Debug, Clone, Default)]
pub struct PermissionSet {
    codes: HashSet<String>,
}

impl PermissionSet {
    pub fn from_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: codes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Vai trò super admin giữ quyền `*` — mọi kiểm tra đều đúng
    pub fn has_wildcard(&self) -> bool {
        self.codes.contains(WILDCARD)
    }

    /// Khớp chính xác mã quyền
    pub fn has(&self, code: &str) -> bool {
        self.has_wildcard() || self.codes.contains(code)
    }

    /// Có ít nhất một quyền trong danh sách
    pub fn has_any<S: AsRef<str>>(&self, codes: &[S]) -> bool {
        self.has_wildcard() || codes.iter().any(|c| self.codes.contains(c.as_ref()))
    }

    /// Có đủ mọi quyền trong danh sách
    pub fn has_all<S: AsRef<str>>(&self, codes: &[S]) -> bool {
        self.has_wildcard() || codes.iter().all(|c| self.codes.contains(c.as_ref()))
    }

    /// Khớp pattern dạng `user.*`
    pub fn matches_pattern(&self, pattern: &str) -> Result<bool, AppError> {
        if self.has_wildcard() {
            return Ok(true);
        }

        let regex = pattern_to_regex(pattern)?;
        Ok(self.codes.iter().any(|code| regex.is_match(code)))
    }

    /// Kiểm tra theo chế độ, trả Forbidden khi không đạt
    pub fn require<S: AsRef<str>>(&self, codes: &[S], mode: RequireMode) -> Result<(), AppError> {
        let granted = match mode {
            RequireMode::Any => self.has_any(codes),
            RequireMode::All => self.has_all(codes),
            RequireMode::Pattern => {
                let pattern = codes
                    .first()
                    .ok_or_else(|| {
                        AppError::Validation("Pattern mode requires one pattern".to_string())
                    })?
                    .as_ref();
                self.matches_pattern(pattern)?
            }
        };

        if granted {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.codes.iter().map(String::as_str)
    }
}

/// Dịch pattern sang regex có neo hai đầu.
/// Mọi đoạn không phải wildcard đều được escape để mã quyền
/// không thể tiêm metacharacter vào regex.
pub fn pattern_to_regex(pattern: &str) -> Result<Regex, AppError> {
    if pattern.is_empty() {
        return Err(AppError::Validation(
            "Permission pattern must not be empty".to_string(),
        ));
    }

    let escaped = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");

    Regex::new(&format!("^{escaped}$"))
        .map_err(|e| AppError::Validation(format!("Invalid permission pattern '{pattern}': {e}")))
}
