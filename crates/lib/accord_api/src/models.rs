//! Request and response bodies.

use accord_core::models::account::Account;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OAuth2 password-grant form (`application/x-www-form-urlencoded`).
///
/// `grant_type`, `scope` and client fields may be present and are ignored.
#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// `POST /accounts` body.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
}

/// Public view of an account. The password hash is never serialized.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub disabled: bool,
    pub external_oauth: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            email: account.email,
            disabled: account.disabled,
            external_oauth: account.external_oauth,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}
