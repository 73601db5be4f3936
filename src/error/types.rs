//! # 错误类型定义

use thiserror::Error;

use super::AuthError;

/// 应用主要错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置相关错误
    #[error("配置错误: {message}")]
    Config {
        /// 错误描述
        message: String,
        /// 底层错误
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 数据库相关错误，保留原始的 `DbErr` 以便调用方区分 “未找到” 等情况
    #[error("数据库错误: {message}")]
    Database {
        /// 错误描述
        message: String,
        /// 原始的存储层错误
        #[source]
        source: sea_orm::DbErr,
    },

    /// 第三方认证错误
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// 业务逻辑错误
    #[error("业务错误: {message}")]
    Business {
        /// 错误描述
        message: String,
    },

    /// 系统内部错误
    #[error("内部错误: {message}")]
    Internal {
        /// 错误描述
        message: String,
        /// 底层错误
        #[source]
        source: Option<anyhow::Error>,
    },

    /// IO相关错误
    #[error("IO错误: {message}")]
    Io {
        /// 错误描述
        message: String,
        /// 原始 IO 错误
        #[source]
        source: std::io::Error,
    },

    /// 序列化/反序列化错误
    #[error("序列化错误: {message}")]
    Serialization {
        /// 错误描述
        message: String,
        /// 原始 JSON 错误
        #[source]
        source: serde_json::Error,
    },

    /// 附加了上下文的错误
    #[error("{context}: {source}")]
    Context {
        /// 上下文描述
        context: String,
        /// 被包装的错误
        #[source]
        source: Box<AppError>,
    },
}

impl AppError {
    /// 创建配置错误
    pub fn config<T: Into<String>>(message: T) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的配置错误
    pub fn config_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建带来源的数据库错误
    pub fn database<T: Into<String>>(message: T, source: sea_orm::DbErr) -> Self {
        Self::Database {
            message: message.into(),
            source,
        }
    }

    /// 创建业务错误
    pub fn business<T: Into<String>>(message: T) -> Self {
        Self::Business {
            message: message.into(),
        }
    }

    /// 创建带来源的内部错误
    pub fn internal_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 底层的数据库错误（穿透上下文包装）
    #[must_use]
    pub fn db_err(&self) -> Option<&sea_orm::DbErr> {
        match self {
            Self::Database { source, .. } => Some(source),
            Self::Context { source, .. } => source.db_err(),
            _ => None,
        }
    }

    /// 底层的认证错误（穿透上下文包装）
    #[must_use]
    pub fn auth_err(&self) -> Option<&AuthError> {
        match self {
            Self::Auth(err) => Some(err),
            Self::Context { source, .. } => source.auth_err(),
            _ => None,
        }
    }

    /// 是否为记录不存在
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self.db_err(), Some(sea_orm::DbErr::RecordNotFound(_)))
    }
}

// 自动转换常见错误类型
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: "文件操作失败".to_string(),
            source: err,
        }
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::config_with_source("TOML解析失败", err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: "JSON处理失败".to_string(),
            source: err,
        }
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::database("数据库操作失败", err)
    }
}

// Bcrypt错误转换
impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        Self::internal_with_source("密码处理失败", err)
    }
}
