//! # 配置管理模块
//!
//! 处理应用配置加载、环境变量覆盖和验证

mod app_config;
mod database;

pub use app_config::{AdminConfig, AppConfig, AuthSection};
pub use database::DatabaseConfig;

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Context, Result};
use crate::{
    linfo,
    logging::{LogComponent, LogStage},
};

/// 默认配置文件路径：优先 `KB_CONFIG_PATH`，否则 `config/config.{RUST_ENV}.toml`
#[must_use]
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var("KB_CONFIG_PATH") {
        return PathBuf::from(path);
    }
    let env = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
    PathBuf::from(format!("config/config.{env}.toml"))
}

/// 加载配置文件
///
/// 文件不存在时使用默认配置，随后应用环境变量覆盖并验证。
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig> {
    let path = path.as_ref();

    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        toml::from_str::<AppConfig>(&content)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))?
    } else {
        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::Config,
            "config_default",
            &format!("配置文件不存在，使用默认配置: {}", path.display())
        );
        AppConfig::default()
    };

    apply_env_overrides(&mut config);
    config.validate()?;

    Ok(config)
}

/// 应用环境变量覆盖
fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(url) = env::var("KB_DATABASE_URL") {
        config.database.url = url;
    }
    if let Ok(public_url) = env::var("KB_PUBLIC_URL") {
        config.auth.public_url = public_url;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[database]
url = "sqlite::memory:"
max_connections = 2
connect_timeout = 5

[auth]
public_url = "https://kb.example.com"
check_timeout_secs = 3
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.database.max_connections, 2);
        assert_eq!(config.auth.check_timeout_secs, 3);
        assert_eq!(config.auth.http_timeout_secs, 15);
        assert_eq!(
            config.auth.callback_url().as_deref(),
            Some("https://kb.example.com/api/user/login/third/callback")
        );
        assert_eq!(config.admin.name, "admin");
    }

    #[test]
    fn test_load_config_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[database]
url = ""
max_connections = 2
connect_timeout = 5
"#
        )
        .unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, AppError::Config { .. }));
        assert!(err.to_string().contains("Database URL cannot be empty"));
    }

    #[test]
    fn test_malformed_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[database\nurl = ").unwrap();

        let err = load_config(file.path()).unwrap_err();
        let AppError::Context { context, source } = &err else {
            panic!("expected context error, got {err:?}");
        };
        assert!(context.contains(&file.path().display().to_string()));
        assert!(matches!(source.as_ref(), AppError::Config { .. }));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path().join("absent.toml")).unwrap();
        assert!(config.database.is_sqlite());
    }
}
