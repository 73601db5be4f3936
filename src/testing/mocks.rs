//! # 测试 Mock 对象

use async_trait::async_trait;
use mockall::mock;
use std::sync::Arc;

use crate::auth::{
    AuthConfig, AuthType, Author, AuthorFactory, AuthorizationRequest, ThirdUser, UserOption,
};
use crate::error::{AuthError, AuthResult};

mock! {
    /// 可编程的提供商替身
    pub Author {}

    #[async_trait]
    impl Author for Author {
        fn auth_type(&self) -> AuthType;
        async fn authorization_url(&self) -> AuthResult<AuthorizationRequest>;
        async fn resolve_user(&self, code: &str, opts: &[UserOption]) -> AuthResult<ThirdUser>;
        async fn check(&self) -> AuthResult<()>;
    }
}

/// Mock 提供商返回的固定 `state`
pub const MOCK_STATE: &str = "mock-state";

/// 以 issuer 地址作为授权地址的 Mock 提供商
///
/// 地址中包含 `unreachable` 时自检失败。
#[must_use]
pub fn mock_author(auth_type: AuthType, url: &str) -> MockAuthor {
    let mut author = MockAuthor::new();
    author.expect_auth_type().return_const(auth_type);

    let authorize = url.to_string();
    author.expect_authorization_url().returning(move || {
        Ok(AuthorizationRequest {
            url: authorize.clone(),
            state: MOCK_STATE.to_string(),
        })
    });

    if url.contains("unreachable") {
        let target = url.to_string();
        author
            .expect_check()
            .returning(move || Err(AuthError::Discovery(format!("{target} is unreachable"))));
    } else {
        author.expect_check().returning(|| Ok(()));
    }
    author
}

/// 为 OIDC 构造 [`mock_author`]，其余类型视为不支持
#[must_use]
pub fn mock_factory() -> impl AuthorFactory {
    |auth_type: AuthType, config: AuthConfig| -> AuthResult<Arc<dyn Author>> {
        match auth_type {
            AuthType::Oidc => Ok(Arc::new(mock_author(auth_type, &config.oauth.url))),
            AuthType::Password => Err(AuthError::UnsupportedProvider(auth_type)),
        }
    }
}
