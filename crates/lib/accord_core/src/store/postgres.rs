//! PostgreSQL-backed account store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{AccountStore, StoreError};
use crate::auth::password::PasswordHash;
use crate::models::account::{Account, NewAccount};

const ACCOUNT_COLUMNS: &str =
    "id, username, email, hashed_password, disabled, external_oauth, created_at, updated_at";

/// Row returned by account queries.
#[derive(Debug, Clone, sqlx::FromRow)]
struct AccountRow {
    id: i64,
    username: String,
    email: String,
    hashed_password: Option<String>,
    disabled: bool,
    external_oauth: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            id: row.id,
            username: row.username,
            email: row.email,
            hashed_password: row.hashed_password.map(PasswordHash::from_stored),
            disabled: row.disabled,
            external_oauth: row.external_oauth,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// [`AccountStore`] over a shared connection pool.
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded migrations from `accord_core/migrations/`.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn fetch_one_where(
        &self,
        predicate: &str,
        value: &str,
    ) -> Result<Option<Account>, StoreError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE {predicate} ORDER BY id LIMIT 1"
        );
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Account::from))
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn get_by_id(&self, id: i64) -> Result<Option<Account>, StoreError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Account::from))
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        self.fetch_one_where("username = $1", username).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        self.fetch_one_where("email = $1", email).await
    }

    async fn list(&self) -> Result<Vec<Account>, StoreError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY id");
        let rows = sqlx::query_as::<_, AccountRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Account::from).collect())
    }

    async fn create(&self, new: NewAccount) -> Result<Account, StoreError> {
        let sql = format!(
            "INSERT INTO accounts (username, email, hashed_password, external_oauth) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(&new.username)
            .bind(&new.email)
            .bind(new.hashed_password.as_ref().map(PasswordHash::as_str))
            .bind(new.external_oauth)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn update(&self, account: &Account) -> Result<Account, StoreError> {
        let sql = format!(
            "UPDATE accounts \
             SET username = $1, email = $2, hashed_password = $3, disabled = $4, updated_at = now() \
             WHERE id = $5 \
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(&account.username)
            .bind(&account.email)
            .bind(account.hashed_password.as_ref().map(PasswordHash::as_str))
            .bind(account.disabled)
            .bind(account.id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Account::from).ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
