//! # 提供商能力接口

use async_trait::async_trait;

use super::types::{AuthType, AuthorizationRequest, ThirdUser, UserOption};
use crate::error::AuthResult;

/// 单个身份提供商需要实现的能力
///
/// 所有方法都可能访问网络，调用方通过丢弃 future 或外层超时来取消。
#[async_trait]
pub trait Author: Send + Sync {
    /// 提供商类型
    fn auth_type(&self) -> AuthType;

    /// 生成跳转到提供商的授权请求，返回的 `state` 由调用方保存并在回调时核对
    async fn authorization_url(&self) -> AuthResult<AuthorizationRequest>;

    /// 用授权码换取经过校验的用户身份
    async fn resolve_user(&self, code: &str, opts: &[UserOption]) -> AuthResult<ThirdUser>;

    /// 轻量的连通性/配置自检，不完成任何用户交换
    async fn check(&self) -> AuthResult<()>;
}
