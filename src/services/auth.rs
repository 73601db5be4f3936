//! # 登录认证服务
//!
//! 登录方式设置的读写、第三方提供商的加载与热更新，以及第三方登录回调时的
//! 本地用户匹配/注册。

use chrono::Utc;
use entity::system_settings::{self, KEY_AUTH};
use entity::users::{self, UserRole};
use sea_orm::{DatabaseConnection, Set, SqlErr};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::auth::{
    AuthConfig, AuthType, AuthorManager, AuthorizationRequest, ThirdUser, UserOption,
};
use crate::config::AuthSection;
use crate::error::Result;
use crate::repo::{QueryOpt, Repository};
use crate::{
    business_error, ensure_business, linfo, lwarn,
    logging::{LogComponent, LogStage},
};

/// 单个登录方式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInfo {
    /// 登录方式
    #[serde(rename = "type")]
    pub auth_type: AuthType,
    /// 登录按钮文案
    #[serde(default)]
    pub button_desc: String,
    /// 提供商配置，密码登录没有
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<AuthConfig>,
}

impl AuthInfo {
    /// 内置的密码登录
    #[must_use]
    pub fn password() -> Self {
        Self {
            auth_type: AuthType::Password,
            button_desc: "密码登录".to_string(),
            config: None,
        }
    }
}

/// 登录方式设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSettings {
    /// 第三方用户首次登录时是否自动注册
    #[serde(default = "default_true")]
    pub enable_register: bool,
    /// 是否允许未登录访问
    #[serde(default = "default_true")]
    pub public_access: bool,
    /// 已启用的登录方式
    #[serde(default)]
    pub auth_infos: Vec<AuthInfo>,
}

const fn default_true() -> bool {
    true
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            enable_register: true,
            public_access: true,
            auth_infos: vec![AuthInfo::password()],
        }
    }
}

impl AuthSettings {
    /// 指定的登录方式
    #[must_use]
    pub fn find(&self, auth_type: AuthType) -> Option<&AuthInfo> {
        self.auth_infos.iter().find(|info| info.auth_type == auth_type)
    }

    /// 是否启用了指定的登录方式
    #[must_use]
    pub fn is_enabled(&self, auth_type: AuthType) -> bool {
        self.find(auth_type).is_some()
    }

    /// 去掉客户端密钥后的副本，用于对外展示
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut settings = self.clone();
        for config in settings.auth_infos.iter_mut().filter_map(|info| info.config.as_mut()) {
            config.oauth.client_secret.clear();
        }
        settings
    }

    fn validate(&self) -> Result<()> {
        ensure_business!(!self.auth_infos.is_empty(), "至少需要启用一种登录方式");

        let mut seen = HashSet::new();
        for info in &self.auth_infos {
            ensure_business!(
                seen.insert(info.auth_type),
                "登录方式重复: {}",
                info.auth_type
            );
            if info.auth_type.is_third_party() {
                let config = info
                    .config
                    .as_ref()
                    .ok_or_else(|| business_error!("{} 缺少提供商配置", info.auth_type))?;
                config
                    .oauth
                    .validate()
                    .map_err(|e| business_error!("{} 配置无效: {}", info.auth_type, e))?;
            }
        }
        Ok(())
    }
}

/// 登录认证服务
pub struct AuthService {
    manager: Arc<AuthorManager>,
    settings_repo: Repository<system_settings::Entity>,
    users: Repository<users::Entity>,
    auth: AuthSection,
}

impl AuthService {
    /// 创建服务，设置表与用户表共用同一个连接
    #[must_use]
    pub fn new(manager: Arc<AuthorManager>, db: Arc<DatabaseConnection>, auth: AuthSection) -> Self {
        Self {
            manager,
            settings_repo: Repository::new(Arc::clone(&db)),
            users: Repository::new(db),
            auth,
        }
    }

    /// 提供商注册表
    #[must_use]
    pub const fn manager(&self) -> &Arc<AuthorManager> {
        &self.manager
    }

    /// 启动时按已保存的设置安装提供商，不做自检；单个提供商失败只记录日志
    pub async fn load(&self) -> Result<()> {
        let settings = self.settings().await?;
        for info in settings.auth_infos {
            let Some(config) = info.config.filter(|_| info.auth_type.is_third_party()) else {
                continue;
            };
            match self.manager.update(info.auth_type, config, false).await {
                Ok(()) => linfo!(
                    "system",
                    LogStage::Startup,
                    LogComponent::AuthService,
                    "load_provider",
                    &format!("已加载登录方式: {}", info.auth_type)
                ),
                Err(e) => lwarn!(
                    "system",
                    LogStage::Startup,
                    LogComponent::AuthService,
                    "load_provider",
                    &format!("跳过登录方式 {}: {e}", info.auth_type)
                ),
            }
        }
        Ok(())
    }

    async fn find_setting(&self) -> Result<Option<system_settings::Model>> {
        let rows = self
            .settings_repo
            .list::<system_settings::Model>(&[
                QueryOpt::equal(system_settings::Column::Key, KEY_AUTH),
                QueryOpt::limit(1),
            ])
            .await?;
        Ok(rows.into_iter().next())
    }

    /// 已保存的登录方式设置，未保存时返回默认值
    pub async fn settings(&self) -> Result<AuthSettings> {
        match self.find_setting().await? {
            Some(row) => Ok(serde_json::from_str(&row.value)?),
            None => Ok(AuthSettings::default()),
        }
    }

    /// 对外展示的设置，不包含客户端密钥
    pub async fn public_settings(&self) -> Result<AuthSettings> {
        Ok(self.settings().await?.redacted())
    }

    /// 校验并保存新的登录方式设置
    ///
    /// 先逐个安装第三方提供商（`verify` 为 true 时会执行自检），任一失败则直接返回，
    /// 设置不会被保存。
    pub async fn update_settings(&self, mut settings: AuthSettings, verify: bool) -> Result<()> {
        settings.validate()?;

        let callback_url = self.auth.callback_url();
        for info in &mut settings.auth_infos {
            if let Some(config) = info.config.as_mut() {
                if config.oauth.redirect_url.is_none() {
                    config.oauth.redirect_url.clone_from(&callback_url);
                }
            }
        }

        for info in &settings.auth_infos {
            if let Some(config) = info.config.as_ref().filter(|_| info.auth_type.is_third_party()) {
                self.manager
                    .update(info.auth_type, config.clone(), verify)
                    .await?;
            }
        }

        let value = serde_json::to_string(&settings)?;
        let now = Utc::now().naive_utc();
        match self.find_setting().await? {
            Some(row) => {
                let patch = system_settings::ActiveModel {
                    id: Set(row.id),
                    value: Set(value),
                    updated_at: Set(now),
                    ..Default::default()
                };
                self.settings_repo.update_by_model(patch, &[]).await?;
            }
            None => {
                let model = system_settings::ActiveModel {
                    key: Set(KEY_AUTH.to_string()),
                    value: Set(value),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                self.settings_repo.create(model).await?;
            }
        }

        linfo!(
            "system",
            LogStage::Configuration,
            LogComponent::AuthService,
            "update_settings",
            &format!(
                "登录方式设置已更新: {:?}",
                settings
                    .auth_infos
                    .iter()
                    .map(|info| info.auth_type.as_str())
                    .collect::<Vec<_>>()
            )
        );
        Ok(())
    }

    /// 第三方登录跳转请求，调用方保存其中的 `state` 并在回调时核对
    pub async fn login_url(&self, auth_type: AuthType) -> Result<AuthorizationRequest> {
        let settings = self.settings().await?;
        ensure_business!(settings.is_enabled(auth_type), "登录方式未启用: {}", auth_type);
        Ok(self.manager.authorization_url(auth_type).await?)
    }

    /// 第三方登录回调：换取身份后匹配本地用户，未注册时按设置决定是否自动注册
    pub async fn login_callback(
        &self,
        auth_type: AuthType,
        code: &str,
        opts: &[UserOption],
    ) -> Result<users::Model> {
        let settings = self.settings().await?;
        ensure_business!(settings.is_enabled(auth_type), "登录方式未启用: {}", auth_type);

        let third = self.manager.resolve_user(auth_type, code, opts).await?;

        if let Some(user) = self.find_third_user(auth_type, &third.third_id).await? {
            self.refresh_user(&user, &third).await?;
            return Ok(self.users.get_by_id(user.id, &[]).await?);
        }

        ensure_business!(settings.enable_register, "注册已关闭: {}", auth_type);
        self.register_user(auth_type, &third).await
    }

    /// 按第三方身份查找本地用户
    async fn find_third_user(
        &self,
        auth_type: AuthType,
        third_id: &str,
    ) -> Result<Option<users::Model>> {
        let rows = self
            .users
            .list::<users::Model>(&[
                QueryOpt::equal(users::Column::AuthType, i32::from(auth_type)),
                QueryOpt::equal(users::Column::ThirdId, third_id),
                QueryOpt::limit(1),
            ])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn refresh_user(&self, user: &users::Model, third: &ThirdUser) -> Result<()> {
        let mut patch = users::ActiveModel {
            id: Set(user.id),
            name: Set(third.name.clone()),
            updated_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        };
        if !third.avatar.is_empty() {
            patch.avatar = Set(third.avatar.clone());
        }
        if !third.email.is_empty() {
            patch.email = Set(third.email.clone());
        }
        self.users.update_by_model(patch, &[]).await?;
        Ok(())
    }

    async fn register_user(&self, auth_type: AuthType, third: &ThirdUser) -> Result<users::Model> {
        let now = Utc::now().naive_utc();
        let model = users::ActiveModel {
            name: Set(third.name.clone()),
            email: Set(third.email.clone()),
            avatar: Set(third.avatar.clone()),
            role: Set(UserRole::User),
            builtin: Set(false),
            auth_type: Set(auth_type.into()),
            third_id: Set(Some(third.third_id.clone())),
            password_hash: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let id = match self.users.create(model).await {
            Ok(id) => id,
            // 并发的首次登录已经注册了同一身份
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                lwarn!(
                    "system",
                    LogStage::Authentication,
                    LogComponent::AuthService,
                    "register_user",
                    &format!("第三方用户已存在，改用已有记录: type={auth_type}")
                );
                return self
                    .find_third_user(auth_type, &third.third_id)
                    .await?
                    .ok_or_else(|| business_error!("第三方用户注册冲突: {}", auth_type));
            }
            Err(e) => return Err(e.into()),
        };

        linfo!(
            "system",
            LogStage::Authentication,
            LogComponent::AuthService,
            "register_user",
            &format!("第三方用户已注册: id={id}, type={auth_type}")
        );
        Ok(self.users.get_by_id(id, &[]).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::OAuthConfig;
    use crate::error::{AppError, AuthErrorKind};
    use crate::testing::{create_test_db, mock_factory};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn oidc_info(url: &str) -> AuthInfo {
        AuthInfo {
            auth_type: AuthType::Oidc,
            button_desc: "OIDC 登录".to_string(),
            config: Some(AuthConfig {
                oauth: OAuthConfig {
                    url: url.to_string(),
                    client_id: "kb".to_string(),
                    client_secret: "secret".to_string(),
                    ..Default::default()
                },
            }),
        }
    }

    fn service_with(db: Arc<DatabaseConnection>) -> AuthService {
        let manager = Arc::new(AuthorManager::new(mock_factory(), Duration::from_secs(1)));
        let auth = AuthSection {
            public_url: "https://kb.example.com/".to_string(),
            ..Default::default()
        };
        AuthService::new(manager, db, auth)
    }

    async fn service() -> AuthService {
        service_with(create_test_db().await.unwrap())
    }

    #[tokio::test]
    async fn test_default_settings() {
        let service = service().await;
        let settings = service.settings().await.unwrap();
        assert_eq!(settings, AuthSettings::default());
        assert!(settings.is_enabled(AuthType::Password));
    }

    #[tokio::test]
    async fn test_update_settings_persists_and_installs() {
        let service = service().await;
        let settings = AuthSettings {
            auth_infos: vec![AuthInfo::password(), oidc_info("https://idp.example.com")],
            ..Default::default()
        };
        service.update_settings(settings, true).await.unwrap();

        let stored = service.settings().await.unwrap();
        let oauth = &stored.find(AuthType::Oidc).unwrap().config.as_ref().unwrap().oauth;
        assert_eq!(
            oauth.redirect_url.as_deref(),
            Some("https://kb.example.com/api/user/login/third/callback")
        );
        assert_eq!(oauth.client_secret, "secret");
        assert!(service.manager().lookup(AuthType::Oidc).await.is_some());

        let public = service.public_settings().await.unwrap();
        let oauth = &public.find(AuthType::Oidc).unwrap().config.as_ref().unwrap().oauth;
        assert_eq!(oauth.client_secret, "");

        // 再次保存走更新分支
        let mut again = stored.clone();
        again.enable_register = false;
        service.update_settings(again, false).await.unwrap();
        assert!(!service.settings().await.unwrap().enable_register);
    }

    #[tokio::test]
    async fn test_failed_check_persists_nothing() {
        let service = service().await;
        let settings = AuthSettings {
            auth_infos: vec![oidc_info("https://unreachable.example.com")],
            ..Default::default()
        };

        let err = service.update_settings(settings, true).await.unwrap_err();
        let auth_err = err.auth_err().unwrap();
        assert_eq!(auth_err.kind(), AuthErrorKind::ProviderCheckFailed);
        assert_eq!(service.settings().await.unwrap(), AuthSettings::default());
        assert!(service.manager().lookup(AuthType::Oidc).await.is_none());
    }

    #[tokio::test]
    async fn test_validation_rejects_bad_settings() {
        let service = service().await;

        let empty = AuthSettings {
            auth_infos: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(
            service.update_settings(empty, false).await,
            Err(AppError::Business { .. })
        ));

        let duplicate = AuthSettings {
            auth_infos: vec![AuthInfo::password(), AuthInfo::password()],
            ..Default::default()
        };
        assert!(matches!(
            service.update_settings(duplicate, false).await,
            Err(AppError::Business { .. })
        ));

        let mut missing_secret = oidc_info("https://idp.example.com");
        if let Some(config) = missing_secret.config.as_mut() {
            config.oauth.client_secret.clear();
        }
        let invalid = AuthSettings {
            auth_infos: vec![missing_secret],
            ..Default::default()
        };
        assert!(matches!(
            service.update_settings(invalid, false).await,
            Err(AppError::Business { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_installs_without_check() {
        let db = create_test_db().await.unwrap();
        let service = service_with(Arc::clone(&db));
        let settings = AuthSettings {
            auth_infos: vec![oidc_info("https://unreachable.example.com")],
            ..Default::default()
        };
        service.update_settings(settings, false).await.unwrap();

        let fresh = service_with(db);
        fresh.load().await.unwrap();
        assert_eq!(fresh.manager().registered().await, vec![AuthType::Oidc]);
    }

    #[tokio::test]
    async fn test_login_url_requires_enabled_type() {
        let service = service().await;
        let err = service.login_url(AuthType::Oidc).await.unwrap_err();
        assert!(matches!(err, AppError::Business { .. }));

        let settings = AuthSettings {
            auth_infos: vec![AuthInfo::password(), oidc_info("https://idp.example.com")],
            ..Default::default()
        };
        service.update_settings(settings, false).await.unwrap();
        let request = service.login_url(AuthType::Oidc).await.unwrap();
        assert_eq!(request.url, "https://idp.example.com");
        assert!(request.state_matches(crate::testing::MOCK_STATE));
        assert!(!request.state_matches("forged"));
    }

    #[test]
    fn test_settings_wire_format() {
        let json = serde_json::json!({
            "enable_register": false,
            "public_access": true,
            "auth_infos": [
                { "type": 1, "button_desc": "密码登录" },
                {
                    "type": 2,
                    "button_desc": "OIDC 登录",
                    "config": { "oauth": { "url": "https://idp", "client_id": "a", "client_secret": "b" } }
                }
            ]
        });
        let settings: AuthSettings = serde_json::from_value(json).unwrap();
        assert!(!settings.enable_register);
        assert_eq!(settings.auth_infos.len(), 2);
        assert_eq!(settings.auth_infos[1].auth_type, AuthType::Oidc);
        assert!(settings.validate().is_ok());
    }
}
