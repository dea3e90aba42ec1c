//! Quy phạm vi về một mối
//! Hai cách biểu diễn (thuộc tính kiểu cũ và cây DataScope) được gộp thành
//! một predicate duy nhất theo nguyên tắc giao — ràng buộc chặt hơn thắng.
//! Người dùng không thuộc danh sách miễn lọc mà không có phạm vi nào
//! thì nhận kết quả rỗng, không bao giờ nhận toàn bộ dữ liệu.

use crate::models::{
    AdminAttribution, AttributePredicate, AttributeScope, DataScope, NormalizedScope, ScopeKind,
};

/// Vai trò miễn lọc phạm vi: ban giám đốc/lãnh đạo/quản trị toàn hệ thống.
/// Danh sách cố định, không cấu hình được lúc chạy.
pub const BYPASS_ROLES: &[&str] = &["super_admin", "Admin", "LanhDao"];

/// Có vai trò nào nằm trong danh sách miễn lọc không
pub fn is_bypass(roles: &[String]) -> bool {
    roles.iter().any(|r| BYPASS_ROLES.contains(&r.as_str()))
}

/// Quy phạm vi của người dùng về một predicate duy nhất.
/// `roles` là hợp của vai trò từ gateway và vai trò phân giải từ CSDL.
pub fn resolve_user_scope(
    roles: &[String],
    attribute: &AttributeScope,
    data_scopes: &[DataScope],
) -> NormalizedScope {
    if is_bypass(roles) {
        return NormalizedScope::Bypass;
    }

    let attribute_predicate = predicate_from_attributes(attribute);
    let path_predicate = predicate_from_data_scopes(data_scopes);

    match (attribute_predicate, path_predicate) {
        (None, None) => NormalizedScope::Unscoped,
        (Some(p), None) | (None, Some(p)) => NormalizedScope::Restricted(p),
        (Some(a), Some(b)) => match merge_predicates(&a, &b) {
            Some(merged) => NormalizedScope::Restricted(merged),
            None => {
                // Hai cách biểu diễn mâu thuẫn nhau — giao là tập rỗng
                tracing::warn!(
                    attribute = ?a,
                    path = ?b,
                    "Attribute scope conflicts with data scope assignment, \
                     resolving to empty result"
                );
                NormalizedScope::Unscoped
            }
        },
    }
}

/// Predicate từ các cột phạm vi kiểu cũ trên bản ghi người dùng
fn predicate_from_attributes(scope: &AttributeScope) -> Option<AttributePredicate> {
    if scope.is_empty() {
        return None;
    }

    Some(AttributePredicate {
        huyen: None,
        xa: scope.xa.clone(),
        tk: scope.tieukhu.clone(),
        khoanh: scope.khoanh.clone(),
    })
}

/// Predicate từ các nút DataScope được gán.
/// Huyện/xã so theo tên, tiểu khu/khoảnh so theo mã — khớp với các cột
/// của lớp ranh giới. Nhiều nút được gộp theo nguyên tắc giao; cặp nút
/// mâu thuẫn (hai xã khác nhau) thì giữ nút gặp trước và cảnh báo —
/// thu hẹp chứ không bao giờ mở rộng.
fn predicate_from_data_scopes(scopes: &[DataScope]) -> Option<AttributePredicate> {
    let mut merged: Option<AttributePredicate> = None;

    for scope in scopes.iter().filter(|s| s.is_active) {
        let Some(kind) = ScopeKind::parse(&scope.kind) else {
            tracing::warn!(code = %scope.code, kind = %scope.kind, "Unknown data scope kind");
            continue;
        };

        let mut predicate = AttributePredicate::default();
        match kind {
            ScopeKind::Country | ScopeKind::Province => {
                // Toàn quốc/tỉnh: không ràng buộc cấp nào trong dữ liệu tỉnh
                continue;
            }
            ScopeKind::District => predicate.huyen = Some(scope.name.clone()),
            ScopeKind::Commune => predicate.xa = Some(scope.name.clone()),
            ScopeKind::Subcompartment => predicate.tk = Some(scope.code.clone()),
            ScopeKind::Compartment => predicate.khoanh = Some(scope.code.clone()),
        }

        merged = match merged {
            None => Some(predicate),
            Some(current) => match merge_predicates(&current, &predicate) {
                Some(m) => Some(m),
                None => {
                    tracing::warn!(
                        kept = ?current,
                        dropped = %scope.code,
                        "Sibling data scopes cannot merge, keeping the first"
                    );
                    Some(current)
                }
            },
        };
    }

    merged
}

/// Giao hai predicate: cấp nào chỉ một bên ràng buộc thì lấy bên đó,
/// hai bên cùng ràng buộc thì phải trùng giá trị — khác nhau là None
/// (tập giao rỗng)
pub fn merge_predicates(
    a: &AttributePredicate,
    b: &AttributePredicate,
) -> Option<AttributePredicate> {
    Some(AttributePredicate {
        huyen: merge_level(&a.huyen, &b.huyen)?,
        xa: merge_level(&a.xa, &b.xa)?,
        tk: merge_level(&a.tk, &b.tk)?,
        khoanh: merge_level(&a.khoanh, &b.khoanh)?,
    })
}

fn merge_level(a: &Option<String>, b: &Option<String>) -> Option<Option<String>> {
    match (a, b) {
        (None, None) => Some(None),
        (Some(v), None) | (None, Some(v)) => Some(Some(v.clone())),
        (Some(x), Some(y)) if x == y => Some(Some(x.clone())),
        _ => None,
    }
}

/// Một lô có khớp predicate phạm vi không.
/// Mỗi cấp bị ràng buộc đòi hỏi thuộc tính đã phân giải và trùng giá trị;
/// cấp không ràng buộc là "bất kỳ". Thuộc tính không phân giải được tại
/// cấp bị ràng buộc → loại (fail-closed).
pub fn attribution_matches(
    attribution: &AdminAttribution,
    predicate: &AttributePredicate,
) -> bool {
    level_matches(&attribution.huyen, &predicate.huyen)
        && level_matches(&attribution.xa, &predicate.xa)
        && level_matches(&attribution.tk, &predicate.tk)
        && level_matches(&attribution.khoanh, &predicate.khoanh)
}

fn level_matches(actual: &Option<String>, required: &Option<String>) -> bool {
    match required {
        None => true,
        Some(required) => actual.as_deref() == Some(required.as_str()),
    }
}

/// Một lô có nằm trong phạm vi đã chuẩn hóa không
pub fn attribution_in_scope(attribution: &AdminAttribution, scope: &NormalizedScope) -> bool {
    match scope {
        NormalizedScope::Bypass => true,
        NormalizedScope::Unscoped => false,
        NormalizedScope::Restricted(predicate) => attribution_matches(attribution, predicate),
    }
}
