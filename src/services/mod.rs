//! # 业务服务层

pub mod auth;

pub use auth::{AuthInfo, AuthService, AuthSettings};
