//! # 应用配置结构定义

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ensure_config;
use crate::error::Result;

/// 应用主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 数据库配置
    #[serde(default)]
    pub database: super::DatabaseConfig,
    /// 第三方认证配置
    #[serde(default)]
    pub auth: AuthSection,
    /// 内置管理员
    #[serde(default)]
    pub admin: AdminConfig,
}

/// 第三方认证配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    /// 对外访问地址，用于拼接 OIDC 回调地址
    pub public_url: String,
    /// 回调路径
    pub callback_path: String,
    /// 提供商自检超时（秒）
    pub check_timeout_secs: u64,
    /// 请求提供商的 HTTP 超时（秒）
    pub http_timeout_secs: u64,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            public_url: String::new(),
            callback_path: "/api/user/login/third/callback".to_string(),
            check_timeout_secs: 10,
            http_timeout_secs: 15,
        }
    }
}

impl AuthSection {
    /// 完整的回调地址，未配置 `public_url` 时为 None
    #[must_use]
    pub fn callback_url(&self) -> Option<String> {
        if self.public_url.is_empty() {
            return None;
        }
        Some(format!(
            "{}{}",
            self.public_url.trim_end_matches('/'),
            self.callback_path
        ))
    }

    /// 提供商自检超时
    #[must_use]
    pub const fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }

    /// HTTP 请求超时
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// 内置管理员配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// 用户名
    pub name: String,
    /// 邮箱
    pub email: String,
    /// 初始密码，仅在首次创建管理员时使用
    pub password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            name: "admin".to_string(),
            email: "admin@kb.local".to_string(),
            password: "admin123456".to_string(),
        }
    }
}

impl AppConfig {
    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        ensure_config!(!self.database.url.is_empty(), "Database URL cannot be empty");
        ensure_config!(
            self.database.max_connections > 0,
            "Database max_connections must be greater than 0"
        );
        ensure_config!(
            self.database.connect_timeout > 0,
            "Database connect_timeout must be greater than 0"
        );
        ensure_config!(
            self.auth.check_timeout_secs > 0 && self.auth.http_timeout_secs > 0,
            "auth timeouts must be greater than 0"
        );
        ensure_config!(
            self.auth.callback_path.starts_with('/'),
            "auth.callback_path must start with '/', got {:?}",
            self.auth.callback_path
        );
        ensure_config!(
            self.admin.password.len() >= 8,
            "admin.password must be at least 8 characters"
        );
        Ok(())
    }
}
