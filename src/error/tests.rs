//! # 错误处理测试

use crate::auth::types::AuthType;
use crate::error::{AppError, AuthError, AuthErrorKind, Context};
use std::error::Error;

#[test]
fn test_config_error_creation() {
    let err = AppError::config("测试配置错误");
    assert!(matches!(err, AppError::Config { .. }));
    assert_eq!(err.to_string(), "配置错误: 测试配置错误");
}

#[test]
fn test_config_error_with_source() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "文件不存在");
    let err = AppError::config_with_source("配置文件加载失败", io_err);

    assert!(err.to_string().contains("配置错误: 配置文件加载失败"));
    assert!(err.source().is_some());
}

#[test]
fn test_db_err_survives_context() {
    let result: Result<(), sea_orm::DbErr> =
        Err(sea_orm::DbErr::RecordNotFound("users".to_string()));

    let err = result.context("查询用户失败").unwrap_err();
    assert!(err.to_string().starts_with("查询用户失败"));
    assert!(err.is_not_found());
    assert!(matches!(
        err.db_err(),
        Some(sea_orm::DbErr::RecordNotFound(_))
    ));
}

#[test]
fn test_auth_error_is_transparent() {
    let err: AppError = AuthError::UnsupportedProvider(AuthType::Password).into();
    assert_eq!(err.to_string(), "unsupported auth provider: password");
    assert_eq!(
        err.auth_err().map(AuthError::kind),
        Some(AuthErrorKind::UnsupportedProvider)
    );
}

#[test]
fn test_auth_error_kinds() {
    let check = AuthError::check_failed(
        AuthType::Oidc,
        AuthError::Discovery("connection refused".to_string()),
    );
    assert_eq!(check.kind(), AuthErrorKind::ProviderCheckFailed);
    assert!(check.source().is_some());
    assert!(check.to_string().contains("oidc"));

    let exchange = AuthError::TokenExchange {
        status: 400,
        body: "invalid_grant".to_string(),
    };
    assert_eq!(exchange.kind(), AuthErrorKind::ExchangeFailed);
}

#[test]
fn test_auto_conversion_from_toml_error() {
    let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
    let err: AppError = toml_err.into();

    assert!(matches!(err, AppError::Config { .. }));
    assert!(err.to_string().contains("配置错误: TOML解析失败"));
}

#[test]
fn test_business_macros() {
    fn guarded(flag: bool) -> crate::error::Result<()> {
        crate::ensure_business!(flag, "注册已关闭: {}", "oidc");
        Ok(())
    }

    assert!(guarded(true).is_ok());
    let err = guarded(false).unwrap_err();
    assert_eq!(err.to_string(), "业务错误: 注册已关闭: oidc");
}
