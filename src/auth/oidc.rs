//! # OIDC 提供商
//!
//! 基于 discovery 文档的 OpenID Connect 授权码流程：
//! - 首次使用时拉取并缓存 `/.well-known/openid-configuration`
//! - 授权码换取令牌后用 JWKS 校验 `id_token`
//! - 存在 `userinfo_endpoint` 时以其 claims 为准

use async_trait::async_trait;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use rand::{Rng, distributions::Alphanumeric};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::OnceCell;
use url::Url;

use super::traits::Author;
use super::types::{
    AuthType, AuthorizationRequest, OAuthConfig, ThirdUser, UserOption, UserOptions,
};
use crate::error::{AuthError, AuthResult};
use crate::{
    ldebug, linfo,
    logging::{LogComponent, LogStage},
};

const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";
const STATE_LEN: usize = 32;

/// discovery 文档中用到的字段
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderMetadata {
    /// 提供商声明的 issuer，必须与配置一致
    pub issuer: String,
    /// 授权端点
    pub authorization_endpoint: String,
    /// 令牌端点
    pub token_endpoint: String,
    /// 签名公钥集合地址
    pub jwks_uri: String,
    /// 用户信息端点，可选
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    id_token: Option<String>,
}

fn same_issuer(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

/// 按 JWK 确定 `id_token` 可接受的签名算法
///
/// JWK 声明了 `alg` 时只接受该算法，否则按密钥类型限定算法族；
/// 令牌头部的算法不在其中时直接拒绝。
fn accepted_algorithms(jwk: &Jwk, header_alg: Algorithm) -> AuthResult<Vec<Algorithm>> {
    let accepted = match &jwk.common.key_algorithm {
        Some(key_alg) => {
            let alg = key_alg.to_string().parse::<Algorithm>().map_err(|_| {
                AuthError::InvalidClaims(format!("JWK algorithm {key_alg:?} cannot sign tokens"))
            })?;
            vec![alg]
        }
        None => match &jwk.algorithm {
            AlgorithmParameters::RSA(_) => vec![
                Algorithm::RS256,
                Algorithm::RS384,
                Algorithm::RS512,
                Algorithm::PS256,
                Algorithm::PS384,
                Algorithm::PS512,
            ],
            AlgorithmParameters::EllipticCurve(_) => vec![Algorithm::ES256, Algorithm::ES384],
            AlgorithmParameters::OctetKeyPair(_) => vec![Algorithm::EdDSA],
            AlgorithmParameters::OctetKey(_) => {
                vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512]
            }
        },
    };

    if !accepted.contains(&header_alg) {
        return Err(AuthError::InvalidClaims(format!(
            "id_token algorithm {header_alg:?} is not accepted for this key"
        )));
    }
    Ok(accepted)
}

fn random_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LEN)
        .map(char::from)
        .collect()
}

/// OIDC 提供商实例
///
/// 配置在构造时被消费，之后只读；替换配置等于构造新实例，缓存的
/// discovery 结果随旧实例一起丢弃。
pub struct OidcAuthor {
    config: OAuthConfig,
    http_client: Client,
    metadata: OnceCell<ProviderMetadata>,
}

impl OidcAuthor {
    /// 创建实例，只做本地校验，不访问网络
    pub fn new(config: OAuthConfig, http_client: Client) -> AuthResult<Self> {
        config.validate()?;
        Url::parse(&config.url)
            .map_err(|e| AuthError::InvalidConfig(format!("invalid issuer url: {e}")))?;
        if let Some(redirect) = &config.redirect_url {
            Url::parse(redirect)
                .map_err(|e| AuthError::InvalidConfig(format!("invalid redirect url: {e}")))?;
        }

        Ok(Self {
            config,
            http_client,
            metadata: OnceCell::new(),
        })
    }

    /// 当前配置
    #[must_use]
    pub const fn config(&self) -> &OAuthConfig {
        &self.config
    }

    fn discovery_url(&self) -> String {
        format!("{}{DISCOVERY_PATH}", self.config.url.trim_end_matches('/'))
    }

    async fn fetch_metadata(&self) -> AuthResult<ProviderMetadata> {
        let url = self.discovery_url();
        ldebug!(
            "system",
            LogStage::Authentication,
            LogComponent::Oidc,
            "discovery",
            &format!("Fetching OIDC discovery document: {url}")
        );

        let response = self.http_client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Discovery(format!(
                "{url} returned HTTP {}",
                status.as_u16()
            )));
        }

        let metadata: ProviderMetadata = response
            .json()
            .await
            .map_err(|e| AuthError::Discovery(format!("malformed discovery document: {e}")))?;

        if !same_issuer(&metadata.issuer, &self.config.url) {
            return Err(AuthError::Discovery(format!(
                "issuer mismatch: expected {}, got {}",
                self.config.url, metadata.issuer
            )));
        }
        Ok(metadata)
    }

    /// 缓存的 discovery 结果，首次调用时拉取
    pub async fn metadata(&self) -> AuthResult<&ProviderMetadata> {
        self.metadata.get_or_try_init(|| self.fetch_metadata()).await
    }

    async fn exchange_code(
        &self,
        metadata: &ProviderMetadata,
        code: &str,
        redirect_url: &str,
    ) -> AuthResult<TokenResponse> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_url),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .http_client
            .post(&metadata.token_endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AuthError::TokenExchange {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| AuthError::InvalidClaims(format!("malformed token response: {e}")))
    }

    /// 用 JWKS 校验 `id_token` 并返回其 claims
    async fn verify_id_token(
        &self,
        metadata: &ProviderMetadata,
        id_token: &str,
    ) -> AuthResult<Map<String, Value>> {
        let header = decode_header(id_token)?;

        let jwks: JwkSet = self
            .http_client
            .get(&metadata.jwks_uri)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let jwk = match header.kid.as_deref() {
            Some(kid) => jwks.find(kid),
            None => jwks.keys.first(),
        }
        .ok_or_else(|| AuthError::InvalidClaims("no matching key in JWKS".to_string()))?;

        let algorithms = accepted_algorithms(jwk, header.alg)?;
        let key = DecodingKey::from_jwk(jwk)?;
        let mut validation = Validation::new(header.alg);
        validation.algorithms = algorithms;
        validation.set_audience(&[self.config.client_id.as_str()]);
        validation.set_issuer(&[metadata.issuer.as_str()]);

        let data = decode::<Map<String, Value>>(id_token, &key, &validation)?;
        Ok(data.claims)
    }

    async fn fetch_userinfo(
        &self,
        endpoint: &str,
        access_token: &str,
    ) -> AuthResult<Map<String, Value>> {
        let claims = self
            .http_client
            .get(endpoint)
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?
            .json::<Map<String, Value>>()
            .await?;
        Ok(claims)
    }
}

#[async_trait]
impl Author for OidcAuthor {
    fn auth_type(&self) -> AuthType {
        AuthType::Oidc
    }

    async fn authorization_url(&self) -> AuthResult<AuthorizationRequest> {
        let redirect_url = self
            .config
            .redirect_url
            .as_deref()
            .ok_or_else(|| AuthError::InvalidConfig("redirect url is not configured".to_string()))?;
        let metadata = self.metadata().await?;

        let mut url = Url::parse(&metadata.authorization_endpoint).map_err(|e| {
            AuthError::Discovery(format!("invalid authorization endpoint: {e}"))
        })?;
        let state = random_state();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", redirect_url)
            .append_pair("scope", &self.config.scope_param())
            .append_pair("state", &state);

        Ok(AuthorizationRequest {
            url: url.into(),
            state,
        })
    }

    async fn resolve_user(&self, code: &str, opts: &[UserOption]) -> AuthResult<ThirdUser> {
        let options = UserOptions::from_options(opts);
        let redirect_url = options
            .redirect_url
            .as_deref()
            .or(self.config.redirect_url.as_deref())
            .ok_or_else(|| AuthError::InvalidConfig("redirect url is not configured".to_string()))?;
        let metadata = self.metadata().await?;

        let token = self.exchange_code(metadata, code, redirect_url).await?;

        let mut claims = match token.id_token.as_deref() {
            Some(id_token) => self.verify_id_token(metadata, id_token).await?,
            None => Map::new(),
        };

        if let Some(endpoint) = metadata.userinfo_endpoint.as_deref() {
            let userinfo = self.fetch_userinfo(endpoint, &token.access_token).await?;
            if let (Some(expected), Some(actual)) = (claims.get("sub"), userinfo.get("sub")) {
                if expected != actual {
                    return Err(AuthError::InvalidClaims(
                        "userinfo sub does not match id_token".to_string(),
                    ));
                }
            }
            claims.extend(userinfo);
        }

        ThirdUser::from_claims(claims, &options)
    }

    async fn check(&self) -> AuthResult<()> {
        let metadata = self.fetch_metadata().await?;
        linfo!(
            "system",
            LogStage::Configuration,
            LogComponent::Oidc,
            "check",
            &format!("OIDC issuer reachable: {}", metadata.issuer)
        );
        // 自检结果直接作为缓存，已有缓存时保留原值
        let _ = self.metadata.set(metadata);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> OAuthConfig {
        OAuthConfig {
            url: url.to_string(),
            client_id: "kb".to_string(),
            client_secret: "secret".to_string(),
            scopes: Vec::new(),
            redirect_url: Some("https://kb.example.com/callback".to_string()),
        }
    }

    #[test]
    fn test_issuer_comparison_ignores_trailing_slash() {
        assert!(same_issuer("https://idp.example.com/", "https://idp.example.com"));
        assert!(!same_issuer("https://idp.example.com", "https://other.example.com"));
    }

    #[test]
    fn test_random_state() {
        let a = random_state();
        let b = random_state();
        assert_eq!(a.len(), STATE_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_new_rejects_bad_config() {
        let client = Client::new();
        assert!(OidcAuthor::new(config("not a url"), client.clone()).is_err());

        let mut missing = config("https://idp.example.com");
        missing.client_id.clear();
        assert!(matches!(
            OidcAuthor::new(missing, client.clone()),
            Err(AuthError::InvalidConfig(_))
        ));

        let author = OidcAuthor::new(config("https://idp.example.com/"), client).unwrap();
        assert_eq!(
            author.discovery_url(),
            "https://idp.example.com/.well-known/openid-configuration"
        );
        assert_eq!(author.auth_type(), AuthType::Oidc);
    }

    #[tokio::test]
    async fn test_authorization_url_requires_redirect() {
        let mut cfg = config("https://idp.example.com");
        cfg.redirect_url = None;
        let author = OidcAuthor::new(cfg, Client::new()).unwrap();

        let err = author.authorization_url().await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidConfig(_)));
    }

    fn jwk(value: serde_json::Value) -> Jwk {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_jwk_alg_pins_token_alg() {
        let key = jwk(serde_json::json!({
            "kty": "oct",
            "kid": "k1",
            "alg": "HS256",
            "k": "c2VjcmV0"
        }));
        assert_eq!(
            accepted_algorithms(&key, Algorithm::HS256).unwrap(),
            vec![Algorithm::HS256]
        );
        assert!(matches!(
            accepted_algorithms(&key, Algorithm::HS384),
            Err(AuthError::InvalidClaims(_))
        ));
    }

    #[test]
    fn test_key_type_limits_algorithms_without_jwk_alg() {
        let rsa = jwk(serde_json::json!({
            "kty": "RSA",
            "kid": "r1",
            "n": "sXchDaQebHnPiGvyDOAT4saGEUetSyo9MKLOoWFsueri23bOdgWp4Dy1WlUzewbgBHod5pcM9H95GQRV3JDXboIRROSBigeC5yjU1hGzHHyXss8UDprecbAYxknTcQkhslANGRUZmdTOQ5qTRsLAt6BTYuyvVRdhS8exSZEy_c4gs_7svlJJQ4H9_NxsiIoLwAEk7-Q3UXERGYw_75IDrGA84-lA_-Ct4eTlXHBIY2EaV7t7LjJaynVJCpkv4LKjTTAumiGUIuQhrNhZLuF_RJLqHpM2kgWFLU7-VTdL1VbC2tejvcI2BlMkEpk1BzBZI0KQB0GaDWFLN-aEAw3vRw",
            "e": "AQAB"
        }));
        assert!(accepted_algorithms(&rsa, Algorithm::RS256).is_ok());
        assert!(accepted_algorithms(&rsa, Algorithm::PS512).is_ok());
        assert!(matches!(
            accepted_algorithms(&rsa, Algorithm::HS256),
            Err(AuthError::InvalidClaims(_))
        ));
    }

    #[test]
    fn test_metadata_optional_userinfo() {
        let metadata: ProviderMetadata = serde_json::from_str(
            r#"{
                "issuer": "https://idp.example.com",
                "authorization_endpoint": "https://idp.example.com/authorize",
                "token_endpoint": "https://idp.example.com/token",
                "jwks_uri": "https://idp.example.com/jwks"
            }"#,
        )
        .unwrap();
        assert!(metadata.userinfo_endpoint.is_none());
    }
}
