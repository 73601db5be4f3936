//! # 第三方认证模块
//!
//! 可插拔的身份提供商：[`Author`] 描述单个提供商的能力，[`AuthorManager`]
//! 持有当前生效的提供商并支持运行时热替换配置。

pub mod manager;
pub mod oidc;
pub mod traits;
pub mod types;

pub use manager::{AuthorFactory, AuthorManager, DefaultAuthorFactory};
pub use oidc::{OidcAuthor, ProviderMetadata};
pub use traits::Author;
pub use types::{
    AuthConfig, AuthType, AuthorizationRequest, OAuthConfig, ThirdUser, UserOption, UserOptions,
};
