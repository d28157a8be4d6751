//! Authorization-code plumbing shared by every provider.

use reqwest::header::ACCEPT;
use serde::Deserialize;
use tracing::warn;
use url::Url;

use super::{ProviderRegistration, ProviderToken};
use crate::auth::AuthError;

/// Build the provider redirect URL for the authorization-code flow.
pub(super) fn authorization_url(
    registration: &ProviderRegistration,
    redirect_uri: &str,
    nonce: &str,
) -> Result<Url, AuthError> {
    let mut params = vec![
        ("response_type", "code"),
        ("client_id", registration.client_id.as_str()),
        ("redirect_uri", redirect_uri),
        ("scope", registration.scope.as_str()),
        ("state", nonce),
    ];
    if registration.provider.is_oidc() {
        params.push(("nonce", nonce));
    }
    Url::parse_with_params(&registration.authorize_url, &params).map_err(|e| {
        AuthError::Internal(format!(
            "invalid authorize URL for {}: {e}",
            registration.provider
        ))
    })
}

/// Token endpoint response. Providers report failures either through the
/// HTTP status or (GitHub) a 200 carrying an `error` field.
#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: Option<String>,
    id_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl TokenEndpointResponse {
    fn error_message(&self) -> Option<String> {
        let error = self.error.as_deref()?;
        Some(match self.error_description.as_deref() {
            Some(desc) => format!("{error}: {desc}"),
            None => error.to_string(),
        })
    }
}

/// Exchange an authorization code for provider tokens.
pub(super) async fn exchange_code(
    http: &reqwest::Client,
    registration: &ProviderRegistration,
    code: &str,
    redirect_uri: &str,
) -> Result<ProviderToken, AuthError> {
    let provider = registration.provider;
    let params = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("client_id", registration.client_id.as_str()),
        ("client_secret", registration.client_secret.as_str()),
        ("redirect_uri", redirect_uri),
    ];

    let resp = http
        .post(&registration.token_url)
        .header(ACCEPT, "application/json")
        .form(&params)
        .send()
        .await
        .map_err(|e| {
            warn!(%provider, error = %e, "token exchange request failed");
            AuthError::Provider(format!("token exchange failed: {e}"))
        })?;

    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let parsed = serde_json::from_str::<TokenEndpointResponse>(&body).ok();

    if let Some(message) = parsed.as_ref().and_then(TokenEndpointResponse::error_message) {
        warn!(%provider, %status, error = %message, "provider rejected token exchange");
        return Err(AuthError::Provider(message));
    }
    if !status.is_success() {
        warn!(%provider, %status, "token exchange returned error status");
        return Err(AuthError::Provider(format!("token exchange HTTP {status}")));
    }

    match parsed {
        Some(TokenEndpointResponse {
            access_token: Some(access_token),
            id_token,
            ..
        }) => Ok(ProviderToken {
            access_token,
            id_token,
        }),
        _ => Err(AuthError::Provider(
            "token response missing access_token".into(),
        )),
    }
}
