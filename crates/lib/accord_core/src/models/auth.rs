//! Authentication domain models.

use serde::{Deserialize, Serialize};

/// JWT claims embedded in access tokens.
///
/// Every field is required; a token missing any of them fails to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Account id.
    pub sub: String,
    pub username: String,
    pub email: String,
    pub disabled: bool,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
}

/// A minted bearer token, as returned to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
}

impl IssuedToken {
    pub fn bearer(access_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
            expires_in,
        }
    }
}

/// Identity returned by an external provider, normalized across providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalProfile {
    pub email: String,
    /// Provider subject id (OIDC providers only).
    pub subject: Option<String>,
    pub name: Option<String>,
}

impl ExternalProfile {
    pub fn from_email(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            subject: None,
            name: None,
        }
    }
}
