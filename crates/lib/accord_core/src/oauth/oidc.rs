//! OIDC ID token verification against a provider's published key set.

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;
use tracing::debug;

use super::ProviderRegistration;
use crate::auth::AuthError;
use crate::models::auth::ExternalProfile;

/// Claims read from a verified ID token. `email_verified` is not read, so
/// an unverified email still links to the local account that owns it.
#[derive(Debug, Clone, Deserialize)]
pub struct IdTokenClaims {
    pub sub: String,
    pub iss: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub nonce: Option<String>,
}

impl IdTokenClaims {
    /// Normalize into a profile. A token without an email cannot be matched to an account.
    pub fn into_profile(self) -> Result<ExternalProfile, AuthError> {
        let email = self.email.ok_or(AuthError::InvalidCredentials)?;
        Ok(ExternalProfile {
            email,
            subject: Some(self.sub),
            name: self.name,
        })
    }
}

/// Fetch the provider key set from `registration.identity_url`.
async fn fetch_jwks(
    http: &reqwest::Client,
    registration: &ProviderRegistration,
) -> Result<JwkSet, AuthError> {
    let resp = http
        .get(&registration.identity_url)
        .send()
        .await
        .map_err(|e| AuthError::Provider(format!("key set fetch failed: {e}")))?;
    if !resp.status().is_success() {
        debug!(provider = %registration.provider, status = %resp.status(), "key set fetch rejected");
        return Err(AuthError::InvalidCredentials);
    }
    resp.json::<JwkSet>()
        .await
        .map_err(|e| AuthError::Provider(format!("key set parse error: {e}")))
}

/// Verify an RS256 ID token: signature (by `kid`), audience, issuer and nonce.
pub async fn verify_id_token(
    http: &reqwest::Client,
    registration: &ProviderRegistration,
    id_token: &str,
    expected_nonce: &str,
) -> Result<IdTokenClaims, AuthError> {
    let provider = registration.provider;
    let invalid = |reason: &str| {
        debug!(%provider, reason, "rejected ID token");
        AuthError::InvalidCredentials
    };

    let header = decode_header(id_token).map_err(|_| invalid("malformed header"))?;
    let kid = header.kid.ok_or_else(|| invalid("missing kid"))?;

    let jwks = fetch_jwks(http, registration).await?;
    let jwk = jwks.find(&kid).ok_or_else(|| invalid("unknown kid"))?;
    let key = DecodingKey::from_jwk(jwk).map_err(|_| invalid("unusable key"))?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[registration.client_id.as_str()]);
    validation.set_issuer(&registration.issuers);
    validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

    let claims = decode::<IdTokenClaims>(id_token, &key, &validation)
        .map_err(|_| invalid("signature or claims"))?
        .claims;

    if !registration.issuers.iter().any(|iss| *iss == claims.iss) {
        return Err(invalid("issuer"));
    }
    if claims.nonce.as_deref() != Some(expected_nonce) {
        return Err(invalid("nonce"));
    }
    Ok(claims)
}
