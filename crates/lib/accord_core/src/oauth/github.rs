//! GitHub OAuth2.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use tracing::debug;

use super::{ProviderAdapter, ProviderRegistration, ProviderToken};
use crate::auth::AuthError;
use crate::models::auth::ExternalProfile;

/// One entry of `GET /user/emails`. `verified` is not read: the primary
/// address is linked to a local account whether or not GitHub verified it.
#[derive(Debug, Deserialize)]
struct GitHubEmail {
    email: String,
    #[serde(default)]
    primary: bool,
}

pub struct GitHubAdapter {
    registration: ProviderRegistration,
    http: reqwest::Client,
}

impl GitHubAdapter {
    pub fn new(registration: ProviderRegistration, http: reqwest::Client) -> Self {
        Self { registration, http }
    }
}

#[async_trait]
impl ProviderAdapter for GitHubAdapter {
    fn registration(&self) -> &ProviderRegistration {
        &self.registration
    }

    fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// `GET /user/emails`, selecting the first entry flagged `primary`.
    async fn fetch_profile(
        &self,
        token: &ProviderToken,
        _nonce: &str,
    ) -> Result<ExternalProfile, AuthError> {
        let resp = self
            .http
            .get(&self.registration.identity_url)
            .bearer_auth(&token.access_token)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, concat!("accord/", env!("CARGO_PKG_VERSION")))
            .send()
            .await
            .map_err(|e| AuthError::Provider(format!("profile request failed: {e}")))?;
        if !resp.status().is_success() {
            debug!(status = %resp.status(), "github email fetch rejected");
            return Err(AuthError::InvalidCredentials);
        }
        let emails: Vec<GitHubEmail> = resp
            .json()
            .await
            .map_err(|_| AuthError::InvalidCredentials)?;
        emails
            .into_iter()
            .find(|e| e.primary)
            .map(|e| ExternalProfile::from_email(e.email))
            .ok_or(AuthError::InvalidCredentials)
    }
}
