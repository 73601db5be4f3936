//! # Entity 模块
//!
//! 包含所有 Sea-ORM 实体定义

pub mod system_settings;
pub mod users;

pub use system_settings::Entity as SystemSettings;
pub use users::Entity as Users;
