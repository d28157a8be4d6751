//! JWT token generation and verification.

use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::{debug, info};

use super::AuthError;
use crate::models::account::Account;
use crate::models::auth::TokenClaims;

/// Default access token lifetime: 24 hours.
pub const DEFAULT_TOKEN_EXPIRY_MINUTES: i64 = 24 * 60;

/// Signs and verifies bearer tokens with a symmetric secret.
#[derive(Clone)]
pub struct TokenCodec {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expires_in: Duration,
}

impl TokenCodec {
    /// Build a codec for an HMAC algorithm (`HS256`, `HS384` or `HS512`).
    pub fn new(secret: &[u8], algorithm: Algorithm, expires_in: Duration) -> Result<Self, AuthError> {
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(AuthError::Internal(format!(
                "unsupported token algorithm {algorithm:?}: expected HS256, HS384 or HS512"
            )));
        }
        if secret.is_empty() {
            return Err(AuthError::Internal("token secret must not be empty".into()));
        }
        Ok(Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            expires_in,
        })
    }

    /// Default lifetime of minted tokens.
    pub fn expires_in(&self) -> Duration {
        self.expires_in
    }

    /// Sign a token for `account` with the default lifetime.
    pub fn encode(&self, account: &Account) -> Result<String, AuthError> {
        self.encode_with_expiry(account, self.expires_in)
    }

    /// Sign a token for `account` expiring `expires_in` from now.
    pub fn encode_with_expiry(
        &self,
        account: &Account,
        expires_in: Duration,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: account.id.to_string(),
            username: account.username.clone(),
            email: account.email.clone(),
            disabled: account.disabled,
            exp: (now + expires_in).timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
    }

    /// Verify signature and expiry, returning the typed claims.
    ///
    /// Every failure (malformed, bad signature, expired, missing claim) is the
    /// same `InvalidCredentials`.
    pub fn decode(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "rejected bearer token");
                AuthError::InvalidCredentials
            })
    }
}

/// Parse a configured algorithm name such as `HS256`.
pub fn parse_algorithm(name: &str) -> Result<Algorithm, AuthError> {
    name.parse::<Algorithm>()
        .map_err(|_| AuthError::Internal(format!("unknown token algorithm: {name}")))
}

/// Resolve the signing secret: `SECRET_KEY`, then `JWT_SECRET`, then the persisted file.
pub fn resolve_jwt_secret(lookup: impl Fn(&str) -> Option<String>) -> String {
    for var in ["SECRET_KEY", "JWT_SECRET"] {
        if let Some(secret) = lookup(var)
            && !secret.is_empty()
        {
            return secret;
        }
    }
    load_or_generate_secret(&jwt_secret_path())
}

/// Read the secret stored at `path`, generating and persisting one if absent.
fn load_or_generate_secret(path: &Path) -> String {
    if let Ok(existing) = std::fs::read_to_string(path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(path, &secret);
    info!(path = %path.display(), "generated new token signing secret");
    secret
}

/// Path to the persisted secret file.
fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("accord")
        .join("jwt-secret")
}
