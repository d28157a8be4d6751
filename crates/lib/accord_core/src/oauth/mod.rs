//! Federated login through external OAuth2 / OIDC providers.
//!
//! Each provider is a [`ProviderAdapter`] that knows how to build the
//! authorization redirect, exchange the returned code, and normalize the
//! provider's identity into an [`ExternalProfile`]. Adapters are selected by
//! the closed [`Provider`] enum; there is no fallback provider.

pub mod auth0;
mod client;
pub mod discord;
pub mod github;
pub mod google;
pub mod oidc;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::auth::AuthError;
use crate::models::auth::ExternalProfile;

/// Supported identity providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Google,
    Discord,
    GitHub,
    Auth0,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::Google,
        Provider::Discord,
        Provider::GitHub,
        Provider::Auth0,
    ];

    /// Path segment naming this provider (`/login/{name}`, `/auth/{name}`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Discord => "discord",
            Provider::GitHub => "github",
            Provider::Auth0 => "auth0",
        }
    }

    /// Whether identity comes from a verified OIDC ID token.
    pub fn is_oidc(&self) -> bool {
        matches!(self, Provider::Google | Provider::Auth0)
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a path segment names no known provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownProvider(pub String);

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownProvider(s.to_string()))
    }
}

// =============================================================================
// Registration
// =============================================================================

/// Static per-provider configuration, loaded once at startup.
#[derive(Clone)]
pub struct ProviderRegistration {
    pub provider: Provider,
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    /// Profile endpoint (Discord, GitHub) or JWKS endpoint (Google, Auth0).
    pub identity_url: String,
    pub scope: String,
    /// Accepted ID token issuers (OIDC providers only).
    pub issuers: Vec<String>,
}

impl ProviderRegistration {
    pub fn google(client_id: &str, client_secret: &str) -> Self {
        Self {
            provider: Provider::Google,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".into(),
            token_url: "https://oauth2.googleapis.com/token".into(),
            identity_url: "https://www.googleapis.com/oauth2/v3/certs".into(),
            scope: "openid email profile".into(),
            issuers: google::ISSUERS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn discord(client_id: &str, client_secret: &str) -> Self {
        Self {
            provider: Provider::Discord,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            authorize_url: "https://discord.com/oauth2/authorize".into(),
            token_url: "https://discord.com/api/oauth2/token".into(),
            identity_url: "https://discord.com/api/users/@me".into(),
            scope: "identify email".into(),
            issuers: Vec::new(),
        }
    }

    pub fn github(client_id: &str, client_secret: &str) -> Self {
        Self {
            provider: Provider::GitHub,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            authorize_url: "https://github.com/login/oauth/authorize".into(),
            token_url: "https://github.com/login/oauth/access_token".into(),
            identity_url: "https://api.github.com/user/emails".into(),
            scope: "user:email".into(),
            issuers: Vec::new(),
        }
    }

    /// Auth0 tenant at `domain` (e.g. `example.eu.auth0.com`).
    pub fn auth0(domain: &str, client_id: &str, client_secret: &str) -> Self {
        let base = format!("https://{}", domain.trim_end_matches('/'));
        Self {
            provider: Provider::Auth0,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            authorize_url: format!("{base}/authorize"),
            token_url: format!("{base}/oauth/token"),
            identity_url: format!("{base}/.well-known/jwks.json"),
            scope: "openid profile email".into(),
            issuers: vec![format!("{base}/")],
        }
    }
}

impl fmt::Debug for ProviderRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistration")
            .field("provider", &self.provider)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("identity_url", &self.identity_url)
            .field("scope", &self.scope)
            .field("issuers", &self.issuers)
            .finish()
    }
}

// =============================================================================
// Adapter contract
// =============================================================================

/// Tokens returned by a provider's token endpoint.
#[derive(Debug, Clone)]
pub struct ProviderToken {
    pub access_token: String,
    pub id_token: Option<String>,
}

/// One external identity provider.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn registration(&self) -> &ProviderRegistration;

    fn http(&self) -> &reqwest::Client;

    fn provider(&self) -> Provider {
        self.registration().provider
    }

    /// URL to send the caller to. `nonce` is carried as `state` (and as the
    /// OIDC `nonce` parameter for OIDC providers).
    fn begin_authorization(&self, redirect_uri: &str, nonce: &str) -> Result<Url, AuthError> {
        client::authorization_url(self.registration(), redirect_uri, nonce)
    }

    /// Exchange an authorization code. Provider-side failures are `AuthError::Provider`.
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<ProviderToken, AuthError> {
        client::exchange_code(self.http(), self.registration(), code, redirect_uri).await
    }

    /// Resolve the caller's identity from the exchanged token.
    async fn fetch_profile(
        &self,
        token: &ProviderToken,
        nonce: &str,
    ) -> Result<ExternalProfile, AuthError>;
}

/// Build the adapter for a registration.
pub fn build_adapter(
    registration: ProviderRegistration,
    http: reqwest::Client,
) -> Arc<dyn ProviderAdapter> {
    match registration.provider {
        Provider::Google => Arc::new(google::GoogleAdapter::new(registration, http)),
        Provider::Discord => Arc::new(discord::DiscordAdapter::new(registration, http)),
        Provider::GitHub => Arc::new(github::GitHubAdapter::new(registration, http)),
        Provider::Auth0 => Arc::new(auth0::Auth0Adapter::new(registration, http)),
    }
}
