//! Errors raised by identity providers and the provider manager.

use std::time::Duration;

use thiserror::Error;

use crate::auth::types::AuthType;

/// Coarse classification used by callers deciding how to report a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorKind {
    /// No provider is registered (or constructible) for the requested type.
    UnsupportedProvider,
    /// A verified update was rejected because the new provider failed its self-check.
    ProviderCheckFailed,
    /// The live provider rejected or failed an authorization exchange.
    ExchangeFailed,
}

/// The primary error type for all identity-provider operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No provider is installed for the requested type.
    #[error("unsupported auth provider: {0}")]
    UnsupportedProvider(AuthType),

    #[error("auth provider {auth_type} check failed: {source}")]
    /// A new provider failed its self-check and was not installed.
    ProviderCheckFailed {
        /// Type of the rejected provider.
        auth_type: AuthType,
        /// Why the check failed.
        #[source]
        source: Box<AuthError>,
    },

    /// The self-check did not finish in time.
    #[error("provider check timed out after {0:?}")]
    CheckTimeout(Duration),

    /// Provider config failed local validation.
    #[error("invalid provider config: {0}")]
    InvalidConfig(String),

    /// The discovery document was unreachable or inconsistent.
    #[error("OIDC discovery failed: {0}")]
    Discovery(String),

    /// Transport-level failure talking to the provider.
    #[error("HTTP request to provider failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The token endpoint answered with a non-success status.
    #[error("token exchange failed ({status}): {body}")]
    TokenExchange {
        /// HTTP status code.
        status: u16,
        /// Response body as returned.
        body: String,
    },

    /// The `id_token` failed signature or claim validation.
    #[error("invalid id_token: {0}")]
    InvalidIdToken(#[from] jsonwebtoken::errors::Error),

    /// Claims were missing or inconsistent.
    #[error("invalid identity claims: {0}")]
    InvalidClaims(String),
}

impl AuthError {
    /// Maps the error onto the three caller-facing categories.
    #[must_use]
    pub const fn kind(&self) -> AuthErrorKind {
        match self {
            Self::UnsupportedProvider(_) => AuthErrorKind::UnsupportedProvider,
            Self::ProviderCheckFailed { .. } => AuthErrorKind::ProviderCheckFailed,
            _ => AuthErrorKind::ExchangeFailed,
        }
    }

    pub(crate) fn check_failed(auth_type: AuthType, source: Self) -> Self {
        Self::ProviderCheckFailed {
            auth_type,
            source: Box::new(source),
        }
    }
}
