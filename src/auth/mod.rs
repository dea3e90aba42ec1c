//! Định danh và phân quyền
//! Định danh do API gateway cung cấp qua header, sau ranh giới khóa chia sẻ

pub mod api_key;
pub mod evaluator;
pub mod identity;
pub mod middleware;

pub use api_key::ApiKeyGenerator;
pub use evaluator::{PermissionSet, RequireMode};
pub use identity::Identity;
pub use middleware::{gateway_identity_middleware, internal_api_key_middleware};
