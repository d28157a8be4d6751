//! Authentication and authorization logic.
//!
//! Password hashing, bearer token encoding, the OAuth state store and the
//! [`Authenticator`] that ties them to the account store.

pub mod authenticator;
pub mod jwt;
pub mod password;
pub mod state;

use thiserror::Error;

use crate::store::StoreError;

pub use authenticator::Authenticator;

/// Authentication errors.
///
/// Every identity-establishing failure collapses into one of these variants;
/// none of them carry storage or token internals back to the caller.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Bad password, unknown account, bad or expired token, failed profile fetch.
    #[error("Invalid authentication credentials")]
    InvalidCredentials,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    /// The upstream identity provider rejected or failed the exchange.
    #[error("OAuth provider error: {0}")]
    Provider(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UniqueViolation(_) => {
                AuthError::Conflict("Submitted credentials already exist".into())
            }
            StoreError::NotFound => AuthError::NotFound("Account not found".into()),
            StoreError::Db(e) => AuthError::Internal(format!("database: {e}")),
        }
    }
}
