//! # KB Backend Library
//!
//! 知识库后端核心库：可插拔的第三方身份提供商管理与通用实体仓储

pub mod app;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod repo;
pub mod services;
pub mod testing;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, Result};
