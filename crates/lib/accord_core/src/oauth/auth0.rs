//! Auth0 (generic OIDC tenant).

use async_trait::async_trait;

use super::{ProviderAdapter, ProviderRegistration, ProviderToken, oidc};
use crate::auth::AuthError;
use crate::models::auth::ExternalProfile;

pub struct Auth0Adapter {
    registration: ProviderRegistration,
    http: reqwest::Client,
}

impl Auth0Adapter {
    pub fn new(registration: ProviderRegistration, http: reqwest::Client) -> Self {
        Self { registration, http }
    }
}

#[async_trait]
impl ProviderAdapter for Auth0Adapter {
    fn registration(&self) -> &ProviderRegistration {
        &self.registration
    }

    fn http(&self) -> &reqwest::Client {
        &self.http
    }

    async fn fetch_profile(
        &self,
        token: &ProviderToken,
        nonce: &str,
    ) -> Result<ExternalProfile, AuthError> {
        let id_token = token
            .id_token
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;
        oidc::verify_id_token(&self.http, &self.registration, id_token, nonce)
            .await?
            .into_profile()
    }
}
