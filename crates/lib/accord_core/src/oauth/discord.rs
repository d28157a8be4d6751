//! Discord OAuth2.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{ProviderAdapter, ProviderRegistration, ProviderToken};
use crate::auth::AuthError;
use crate::models::auth::ExternalProfile;

#[derive(Debug, Deserialize)]
struct DiscordUser {
    email: Option<String>,
}

pub struct DiscordAdapter {
    registration: ProviderRegistration,
    http: reqwest::Client,
}

impl DiscordAdapter {
    pub fn new(registration: ProviderRegistration, http: reqwest::Client) -> Self {
        Self { registration, http }
    }
}

#[async_trait]
impl ProviderAdapter for DiscordAdapter {
    fn registration(&self) -> &ProviderRegistration {
        &self.registration
    }

    fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// `GET /users/@me`, reading its `email` field.
    async fn fetch_profile(
        &self,
        token: &ProviderToken,
        _nonce: &str,
    ) -> Result<ExternalProfile, AuthError> {
        let resp = self
            .http
            .get(&self.registration.identity_url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| AuthError::Provider(format!("profile request failed: {e}")))?;
        if !resp.status().is_success() {
            debug!(status = %resp.status(), "discord profile fetch rejected");
            return Err(AuthError::InvalidCredentials);
        }
        let user: DiscordUser = resp
            .json()
            .await
            .map_err(|_| AuthError::InvalidCredentials)?;
        user.email
            .map(ExternalProfile::from_email)
            .ok_or(AuthError::InvalidCredentials)
    }
}
