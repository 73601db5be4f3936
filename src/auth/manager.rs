//! # 第三方认证管理器
//!
//! 按登录方式持有当前生效的 [`Author`]，支持运行时替换配置：
//! - 新实例在锁外构造并（可选）自检，通过后才写入映射
//! - 锁只保护映射的读写，网络调用全部在锁外执行
//! - 查找返回实例的 `Arc` 快照，替换后仍在进行中的调用继续使用旧实例

use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::oidc::OidcAuthor;
use super::traits::Author;
use super::types::{AuthConfig, AuthType, AuthorizationRequest, ThirdUser, UserOption};
use crate::config::AuthSection;
use crate::error::{AuthError, AuthResult};
use crate::{
    linfo, lwarn,
    logging::{LogComponent, LogStage},
};

/// 根据登录方式和配置构造提供商实例
///
/// 构造过程只做本地校验，不应访问网络。
pub trait AuthorFactory: Send + Sync {
    /// 构造指定登录方式的提供商
    fn build(&self, auth_type: AuthType, config: AuthConfig) -> AuthResult<Arc<dyn Author>>;
}

impl<F> AuthorFactory for F
where
    F: Fn(AuthType, AuthConfig) -> AuthResult<Arc<dyn Author>> + Send + Sync,
{
    fn build(&self, auth_type: AuthType, config: AuthConfig) -> AuthResult<Arc<dyn Author>> {
        self(auth_type, config)
    }
}

/// 内置的提供商构造器，目前只支持 OIDC
#[derive(Debug, Clone)]
pub struct DefaultAuthorFactory {
    http_client: Client,
}

impl DefaultAuthorFactory {
    /// 使用给定的 HTTP 超时创建构造器
    pub fn new(http_timeout: Duration) -> AuthResult<Self> {
        let http_client = Client::builder().timeout(http_timeout).build()?;
        Ok(Self { http_client })
    }

    /// 复用已有的 HTTP 客户端
    #[must_use]
    pub const fn with_client(http_client: Client) -> Self {
        Self { http_client }
    }
}

impl AuthorFactory for DefaultAuthorFactory {
    fn build(&self, auth_type: AuthType, config: AuthConfig) -> AuthResult<Arc<dyn Author>> {
        match auth_type {
            AuthType::Oidc => Ok(Arc::new(OidcAuthor::new(
                config.oauth,
                self.http_client.clone(),
            )?)),
            AuthType::Password => Err(AuthError::UnsupportedProvider(auth_type)),
        }
    }
}

/// 提供商注册表
///
/// 显式构造并通过 `Arc` 注入给需要认证的组件，测试中可以各自创建互不干扰的实例。
pub struct AuthorManager {
    authors: RwLock<HashMap<AuthType, Arc<dyn Author>>>,
    factory: Box<dyn AuthorFactory>,
    check_timeout: Duration,
}

impl AuthorManager {
    /// 使用自定义构造器创建空注册表
    pub fn new(factory: impl AuthorFactory + 'static, check_timeout: Duration) -> Self {
        Self {
            authors: RwLock::new(HashMap::new()),
            factory: Box::new(factory),
            check_timeout,
        }
    }

    /// 按配置创建使用 [`DefaultAuthorFactory`] 的注册表
    pub fn from_config(config: &AuthSection) -> AuthResult<Self> {
        let factory = DefaultAuthorFactory::new(config.http_timeout())?;
        Ok(Self::new(factory, config.check_timeout()))
    }

    /// 当前生效的提供商
    pub async fn lookup(&self, auth_type: AuthType) -> Option<Arc<dyn Author>> {
        self.authors.read().await.get(&auth_type).cloned()
    }

    /// 已注册的登录方式，按数值排序
    pub async fn registered(&self) -> Vec<AuthType> {
        let mut types: Vec<AuthType> = self.authors.read().await.keys().copied().collect();
        types.sort_unstable();
        types
    }

    /// 构造新实例并替换映射中的条目
    ///
    /// `verify` 为 true 时先执行自检（受 `check_timeout` 限制），失败则放弃本次更新，
    /// 原有实例保持不变。
    pub async fn update(
        &self,
        auth_type: AuthType,
        config: AuthConfig,
        verify: bool,
    ) -> AuthResult<()> {
        let author = self.factory.build(auth_type, config)?;

        if verify {
            match tokio::time::timeout(self.check_timeout, author.check()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    lwarn!(
                        "system",
                        LogStage::Configuration,
                        LogComponent::AuthManager,
                        "check_provider",
                        &format!("Provider {auth_type} failed its check: {e}")
                    );
                    return Err(AuthError::check_failed(auth_type, e));
                }
                Err(_) => {
                    lwarn!(
                        "system",
                        LogStage::Configuration,
                        LogComponent::AuthManager,
                        "check_provider",
                        &format!("Provider {auth_type} check timed out")
                    );
                    return Err(AuthError::check_failed(
                        auth_type,
                        AuthError::CheckTimeout(self.check_timeout),
                    ));
                }
            }
        }

        let previous = self.authors.write().await.insert(auth_type, author);

        linfo!(
            "system",
            LogStage::Configuration,
            LogComponent::AuthManager,
            "update_provider",
            &format!(
                "Provider {auth_type} {} (verified: {verify})",
                if previous.is_some() { "replaced" } else { "registered" }
            )
        );
        Ok(())
    }

    async fn require(&self, auth_type: AuthType) -> AuthResult<Arc<dyn Author>> {
        self.lookup(auth_type)
            .await
            .ok_or(AuthError::UnsupportedProvider(auth_type))
    }

    /// 生成授权跳转请求
    pub async fn authorization_url(&self, auth_type: AuthType) -> AuthResult<AuthorizationRequest> {
        self.require(auth_type).await?.authorization_url().await
    }

    /// 用授权码换取第三方用户，错误原样返回，不做重试
    pub async fn resolve_user(
        &self,
        auth_type: AuthType,
        code: &str,
        opts: &[UserOption],
    ) -> AuthResult<ThirdUser> {
        self.require(auth_type).await?.resolve_user(code, opts).await
    }
}
