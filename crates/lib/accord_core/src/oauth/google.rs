//! Google sign-in (OIDC).

use async_trait::async_trait;

use super::{ProviderAdapter, ProviderRegistration, ProviderToken, oidc};
use crate::auth::AuthError;
use crate::models::auth::ExternalProfile;

/// Issuers Google signs ID tokens with.
pub const ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Identity comes from the verified ID token; no profile request is made.
pub struct GoogleAdapter {
    registration: ProviderRegistration,
    http: reqwest::Client,
}

impl GoogleAdapter {
    pub fn new(registration: ProviderRegistration, http: reqwest::Client) -> Self {
        Self { registration, http }
    }
}

#[async_trait]
impl ProviderAdapter for GoogleAdapter {
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
        // The registration may be overridden; the issuer rule is not.
        let claims = oidc::verify_id_token(&self.http, &self.registration, id_token, nonce).await?;
        if !ISSUERS.contains(&claims.iss.as_str()) {
            return Err(AuthError::InvalidCredentials);
        }
        claims.into_profile()
    }
}
