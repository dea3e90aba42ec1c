//! Tầng nghiệp vụ

pub mod gate_service;
pub mod rbac_service;
pub mod role_service;
pub mod scope_service;

pub use gate_service::ScopedQueryGate;
pub use rbac_service::{RbacService, ResolvedUser};
pub use role_service::RoleService;
