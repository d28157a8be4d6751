//! Account persistence.
//!
//! [`AccountStore`] is the only contract the authenticator and the CRUD
//! handlers depend on. Each method is a single atomic operation; there are no
//! multi-step transactions to roll back.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::account::{Account, NewAccount};

pub use memory::MemoryAccountStore;
pub use postgres::PgAccountStore;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint (e.g. `accounts_username_key`) rejected the write.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Row not found")]
    NotFound,

    #[error("Database error: {0}")]
    Db(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StoreError::UniqueViolation(db.constraint().unwrap_or("unique").to_string())
            }
            other => StoreError::Db(other),
        }
    }
}

/// CRUD over accounts, keyed by primary key or a unique lookup field.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_by_id(&self, id: i64) -> Result<Option<Account>, StoreError>;

    async fn get_by_username(&self, username: &str) -> Result<Option<Account>, StoreError>;

    /// Exact, case-sensitive match. Returns the oldest account when several share an email.
    async fn get_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// All accounts, ordered by id.
    async fn list(&self) -> Result<Vec<Account>, StoreError>;

    async fn create(&self, new: NewAccount) -> Result<Account, StoreError>;

    /// Persist every mutable field of `account`. Fails with `NotFound` if it was deleted.
    async fn update(&self, account: &Account) -> Result<Account, StoreError>;

    /// Returns `false` when no account had this id.
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;
}
