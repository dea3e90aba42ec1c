//! Các model dữ liệu
//! Quyền/vai trò thuộc CSDL phân quyền; lô mất rừng thuộc CSDL GIS

pub mod matrung;
pub mod permission;
pub mod scope;
pub mod user;

pub use matrung::*;
pub use permission::*;
pub use scope::*;
pub use user::*;
