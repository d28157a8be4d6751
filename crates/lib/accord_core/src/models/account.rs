//! Account records and their create/patch shapes.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::auth::AuthError;
use crate::auth::password::PasswordHash;

/// Maximum username length (matches the `accounts.username` column).
pub const USERNAME_MAX_LEN: usize = 100;

/// Maximum email length (matches the `accounts.email` column).
pub const EMAIL_MAX_LEN: usize = 254;

/// An authenticatable identity.
#[derive(Debug, Clone)]
pub struct Account {
    /// Storage-assigned primary key.
    pub id: i64,
    pub username: String,
    pub email: String,
    /// `None` for accounts provisioned by an external provider.
    pub hashed_password: Option<PasswordHash>,
    pub disabled: bool,
    pub external_oauth: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Replace the stored hash with a hash of `plaintext`.
    pub fn set_password(&mut self, plaintext: &str) -> Result<(), AuthError> {
        self.hashed_password = Some(PasswordHash::new(plaintext)?);
        Ok(())
    }

    /// Accounts without a local password never verify.
    pub fn verify_password(&self, plaintext: &str) -> bool {
        self.hashed_password
            .as_ref()
            .is_some_and(|hash| hash.verify(plaintext))
    }
}

/// Fields for inserting a new account. The id and timestamps come from storage.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub hashed_password: Option<PasswordHash>,
    pub external_oauth: bool,
}

impl NewAccount {
    /// A locally-authenticated account. Validates the username and, when
    /// given, the email; without one the username is stored as the email.
    pub fn with_password(
        username: &str,
        email: Option<&str>,
        password: &str,
    ) -> Result<Self, AuthError> {
        validate_username(username)?;
        if let Some(email) = email {
            validate_email(email)?;
            check_email_shaped_username(username, email)?;
        }
        Ok(Self {
            username: username.to_string(),
            email: email.unwrap_or(username).to_string(),
            hashed_password: Some(PasswordHash::new(password)?),
            external_oauth: false,
        })
    }

    /// An account without credentials (created through `POST /accounts`).
    pub fn without_password(username: &str, email: &str) -> Result<Self, AuthError> {
        validate_username(username)?;
        validate_email(email)?;
        check_email_shaped_username(username, email)?;
        Ok(Self {
            username: username.to_string(),
            email: email.to_string(),
            hashed_password: None,
            external_oauth: false,
        })
    }

    /// A just-in-time account for a federated login: the email doubles as
    /// username, so it must fit both columns.
    pub fn external(email: &str) -> Result<Self, AuthError> {
        validate_email(email)?;
        validate_username(email)?;
        Ok(Self {
            username: email.to_string(),
            email: email.to_string(),
            hashed_password: None,
            external_oauth: true,
        })
    }
}

/// Partial update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub disabled: Option<bool>,
}

impl AccountPatch {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.password.is_none()
            && self.disabled.is_none()
    }

    /// Merge the provided fields into `account`, validating each one first.
    ///
    /// Nothing is written to `account` unless every provided field is valid.
    pub fn apply(self, account: &mut Account) -> Result<(), AuthError> {
        if let Some(username) = &self.username {
            validate_username(username)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if self.username.is_some() || self.email.is_some() {
            check_email_shaped_username(
                self.username.as_deref().unwrap_or(&account.username),
                self.email.as_deref().unwrap_or(&account.email),
            )?;
        }
        let hashed_password = self.password.as_deref().map(PasswordHash::new).transpose()?;

        if let Some(username) = self.username {
            account.username = username;
        }
        if let Some(email) = self.email {
            account.email = email;
        }
        if let Some(hash) = hashed_password {
            account.hashed_password = Some(hash);
        }
        if let Some(disabled) = self.disabled {
            account.disabled = disabled;
        }
        Ok(())
    }
}

/// Check a username is non-empty and fits its column.
pub fn validate_username(username: &str) -> Result<(), AuthError> {
    if username.trim().is_empty() {
        return Err(AuthError::Validation("username must not be empty".into()));
    }
    if username.chars().count() > USERNAME_MAX_LEN {
        return Err(AuthError::Validation(format!(
            "username must be at most {USERNAME_MAX_LEN} characters"
        )));
    }
    Ok(())
}

/// A username that is itself an email address must be the account's own
/// email. Federated logins provision `email` as the username; a foreign
/// account holding it would block that login.
pub fn check_email_shaped_username(username: &str, email: &str) -> Result<(), AuthError> {
    if username != email && validate_email(username).is_ok() {
        return Err(AuthError::Validation(
            "username that is an email address must match the account email".into(),
        ));
    }
    Ok(())
}

/// Structural email check: one `@`, non-empty local part, dotted domain.
pub fn validate_email(email: &str) -> Result<(), AuthError> {
    let invalid = || AuthError::Validation("value is not a valid email address".into());

    if email.len() > EMAIL_MAX_LEN || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(invalid());
    }
    Ok(())
}
