//! # 认证类型定义
//!
//! 提供商类型、提供商配置以及交换得到的第三方用户

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{AuthError, AuthResult};

/// 登录方式
///
/// 数值与前端管理页保持一致：密码 = 1，OIDC = 2。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AuthType {
    /// 内置的账号密码登录，没有对应的第三方提供商
    Password,
    /// OpenID Connect
    Oidc,
}

impl AuthType {
    /// 存储与传输使用的数值
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Password => 1,
            Self::Oidc => 2,
        }
    }

    /// 小写名称
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::Oidc => "oidc",
        }
    }

    /// 是否需要第三方提供商
    #[must_use]
    pub const fn is_third_party(self) -> bool {
        !matches!(self, Self::Password)
    }
}

impl TryFrom<u8> for AuthType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Password),
            2 => Ok(Self::Oidc),
            other => Err(format!("unknown auth type: {other}")),
        }
    }
}

impl From<AuthType> for u8 {
    fn from(value: AuthType) -> Self {
        value.as_u8()
    }
}

impl From<AuthType> for i32 {
    fn from(value: AuthType) -> Self {
        Self::from(value.as_u8())
    }
}

impl FromStr for AuthType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "password" | "1" => Ok(Self::Password),
            "oidc" | "2" => Ok(Self::Oidc),
            other => Err(format!("unknown auth type: {other}")),
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 提供商配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// OAuth 客户端配置
    #[serde(default)]
    pub oauth: OAuthConfig,
}

const DEFAULT_SCOPES: [&str; 3] = ["openid", "profile", "email"];

/// OAuth/OIDC 客户端配置
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Issuer 地址
    pub url: String,
    /// 客户端标识
    pub client_id: String,
    /// 客户端密钥
    pub client_secret: String,
    /// 额外的 scope，为空时使用默认值
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    /// 授权完成后的回调地址
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

impl OAuthConfig {
    /// `scope` 参数，始终包含 `openid`
    #[must_use]
    pub fn scope_param(&self) -> String {
        if self.scopes.is_empty() {
            return DEFAULT_SCOPES.join(" ");
        }
        let mut scopes: Vec<&str> = self.scopes.iter().map(String::as_str).collect();
        if !scopes.contains(&"openid") {
            scopes.insert(0, "openid");
        }
        scopes.join(" ")
    }

    /// 必填字段检查
    pub fn validate(&self) -> AuthResult<()> {
        for (field, value) in [
            ("url", &self.url),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ] {
            if value.trim().is_empty() {
                return Err(AuthError::InvalidConfig(format!("{field} is required")));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("url", &self.url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("scopes", &self.scopes)
            .field("redirect_url", &self.redirect_url)
            .finish()
    }
}

/// 授权跳转请求
///
/// `state` 需由调用方保存（例如写入会话 cookie），回调时与提供商带回的
/// `state` 参数比对后再兑换授权码。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    /// 跳转到提供商的完整地址
    pub url: String,
    /// 地址中携带的 `state` 参数
    pub state: String,
}

impl AuthorizationRequest {
    /// 回调带回的 `state` 是否与本次请求一致
    #[must_use]
    pub fn state_matches(&self, returned: &str) -> bool {
        !self.state.is_empty() && self.state == returned
    }
}

/// 获取第三方用户时的调整项
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserOption {
    /// 用作显示名的 claim
    NameClaim(String),
    /// 用作邮箱的 claim
    EmailClaim(String),
    /// 用作头像的 claim
    AvatarClaim(String),
    /// 覆盖授权码交换时使用的回调地址
    RedirectUrl(String),
}

/// 合并后的调整项，后出现的选项覆盖先出现的
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserOptions {
    /// 显示名 claim
    pub name_claim: String,
    /// 邮箱 claim
    pub email_claim: String,
    /// 头像 claim
    pub avatar_claim: String,
    /// 覆盖的回调地址
    pub redirect_url: Option<String>,
}

impl Default for UserOptions {
    fn default() -> Self {
        Self {
            name_claim: "name".to_string(),
            email_claim: "email".to_string(),
            avatar_claim: "picture".to_string(),
            redirect_url: None,
        }
    }
}

impl UserOptions {
    /// 依次合并调整项
    #[must_use]
    pub fn from_options(opts: &[UserOption]) -> Self {
        opts.iter().fold(Self::default(), |mut acc, opt| {
            match opt {
                UserOption::NameClaim(claim) => acc.name_claim.clone_from(claim),
                UserOption::EmailClaim(claim) => acc.email_claim.clone_from(claim),
                UserOption::AvatarClaim(claim) => acc.avatar_claim.clone_from(claim),
                UserOption::RedirectUrl(url) => acc.redirect_url = Some(url.clone()),
            }
            acc
        })
    }
}

/// 第三方提供商返回的用户身份
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThirdUser {
    /// 提供商内的唯一标识（`sub`）
    pub third_id: String,
    /// 显示名
    pub name: String,
    /// 邮箱，未验证时为空
    pub email: String,
    /// 头像地址
    pub avatar: String,
    /// 提供商是否确认过邮箱
    pub email_verified: bool,
    /// 原始 claims
    pub claims: Map<String, Value>,
}

fn claim_str<'a>(claims: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    claims
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

impl ThirdUser {
    /// 按调整项从 claims 构造用户，缺少 `sub` 视为无效
    pub fn from_claims(claims: Map<String, Value>, opts: &UserOptions) -> AuthResult<Self> {
        let third_id = claim_str(&claims, "sub")
            .ok_or_else(|| AuthError::InvalidClaims("missing sub claim".to_string()))?
            .to_string();

        let email = claim_str(&claims, &opts.email_claim)
            .unwrap_or_default()
            .to_string();
        let name = claim_str(&claims, &opts.name_claim)
            .or_else(|| claim_str(&claims, "preferred_username"))
            .or_else(|| email.split('@').next().filter(|s| !s.is_empty()))
            .unwrap_or(&third_id)
            .to_string();
        let avatar = claim_str(&claims, &opts.avatar_claim)
            .unwrap_or_default()
            .to_string();
        let email_verified = claims
            .get("email_verified")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Ok(Self {
            third_id,
            name,
            email,
            avatar,
            email_verified,
            claims,
        })
    }
}
