//! 集成测试共用的数据库与伪 OIDC Issuer
#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kb_backend::auth::{AuthConfig, OAuthConfig};
use kb_backend::config::DatabaseConfig;
use kb_backend::database::{init_database, sync_schema};

pub const CLIENT_ID: &str = "kb-client";
pub const CLIENT_SECRET: &str = "kb-secret";
pub const REDIRECT_URL: &str = "https://kb.example.com/api/user/login/third/callback";
pub const KEY_ID: &str = "test-key";
const SIGNING_SECRET: &[u8] = b"kb-oidc-integration-test-secret!";
/// `SIGNING_SECRET` 的 base64url 编码
const SIGNING_SECRET_B64: &str = "a2Itb2lkYy1pbnRlZ3JhdGlvbi10ZXN0LXNlY3JldCE";

pub async fn setup_test_db() -> Arc<DatabaseConnection> {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        ..Default::default()
    };
    let db = init_database(&config).await.expect("connect test db");
    sync_schema(&db).await.expect("sync schema");
    Arc::new(db)
}

/// 基于 wiremock 的 OIDC Issuer
pub struct FakeIssuer {
    pub server: MockServer,
}

impl FakeIssuer {
    /// 启动并挂载 discovery 与 JWKS
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let issuer = Self { server };
        issuer.mount_discovery(&issuer.uri()).await;

        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "keys": [{
                    "kty": "oct",
                    "kid": KEY_ID,
                    "alg": "HS256",
                    "k": SIGNING_SECRET_B64
                }]
            })))
            .mount(&issuer.server)
            .await;
        issuer
    }

    /// 只挂载 discovery，文档中声明的 issuer 由调用方指定
    pub async fn start_with_issuer(advertised: &str) -> Self {
        let server = MockServer::start().await;
        let issuer = Self { server };
        issuer.mount_discovery(advertised).await;
        issuer
    }

    async fn mount_discovery(&self, advertised: &str) {
        let base = self.uri();
        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "issuer": advertised,
                "authorization_endpoint": format!("{base}/authorize"),
                "token_endpoint": format!("{base}/token"),
                "jwks_uri": format!("{base}/jwks"),
                "userinfo_endpoint": format!("{base}/userinfo")
            })))
            .mount(&self.server)
            .await;
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn oauth_config(&self) -> OAuthConfig {
        OAuthConfig {
            url: self.uri(),
            client_id: CLIENT_ID.to_string(),
            client_secret: CLIENT_SECRET.to_string(),
            scopes: Vec::new(),
            redirect_url: Some(REDIRECT_URL.to_string()),
        }
    }

    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            oauth: self.oauth_config(),
        }
    }

    /// 签发 HS256 id_token
    pub fn id_token(&self, sub: &str, audience: &str) -> String {
        self.id_token_with_alg(sub, audience, Algorithm::HS256)
    }

    /// 用同一密钥按指定 HMAC 算法签发 id_token
    pub fn id_token_with_alg(&self, sub: &str, audience: &str, alg: Algorithm) -> String {
        let mut header = Header::new(alg);
        header.kid = Some(KEY_ID.to_string());
        let now = Utc::now().timestamp();
        let claims = json!({
            "iss": self.uri(),
            "sub": sub,
            "aud": audience,
            "iat": now,
            "exp": now + 600,
            "email": format!("{sub}@example.com"),
            "email_verified": true
        });
        encode(&header, &claims, &EncodingKey::from_secret(SIGNING_SECRET)).expect("sign id_token")
    }

    /// 指定授权码的令牌响应
    pub async fn mount_token(&self, code: &str, access_token: &str, id_token: Option<String>) {
        let mut body = json!({
            "access_token": access_token,
            "token_type": "Bearer",
            "expires_in": 3600
        });
        if let Some(id_token) = id_token {
            body["id_token"] = Value::String(id_token);
        }
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains(format!("code={code}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// 令牌端点拒绝所有请求
    pub async fn mount_token_error(&self, status: u16, body: &str) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_userinfo(&self, access_token: &str, claims: Value) {
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header("authorization", format!("Bearer {access_token}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(claims))
            .mount(&self.server)
            .await;
    }
}
