//! In-memory account store for tests and database-less local runs.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{AccountStore, StoreError};
use crate::models::account::{Account, NewAccount};

const USERNAME_CONSTRAINT: &str = "accounts_username_key";

#[derive(Debug, Default)]
struct Inner {
    accounts: BTreeMap<i64, Account>,
    next_id: i64,
}

/// [`AccountStore`] kept in process memory. Enforces the same unique-username rule
/// as the `accounts` table; the write lock makes each operation atomic.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    inner: RwLock<Inner>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.accounts.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn get_by_id(&self, id: i64) -> Result<Option<Account>, StoreError> {
        Ok(self.inner.read().await.accounts.get(&id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .accounts
            .values()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.accounts.values().find(|a| a.email == email).cloned())
    }

    async fn list(&self) -> Result<Vec<Account>, StoreError> {
        Ok(self.inner.read().await.accounts.values().cloned().collect())
    }

    async fn create(&self, new: NewAccount) -> Result<Account, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.accounts.values().any(|a| a.username == new.username) {
            return Err(StoreError::UniqueViolation(USERNAME_CONSTRAINT.into()));
        }
        inner.next_id += 1;
        let now = Utc::now();
        let account = Account {
            id: inner.next_id,
            username: new.username,
            email: new.email,
            hashed_password: new.hashed_password,
            disabled: false,
            external_oauth: new.external_oauth,
            created_at: now,
            updated_at: now,
        };
        inner.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn update(&self, account: &Account) -> Result<Account, StoreError> {
        let mut inner = self.inner.write().await;
        if inner
            .accounts
            .values()
            .any(|a| a.id != account.id && a.username == account.username)
        {
            return Err(StoreError::UniqueViolation(USERNAME_CONSTRAINT.into()));
        }
        let stored = inner
            .accounts
            .get_mut(&account.id)
            .ok_or(StoreError::NotFound)?;
        stored.username = account.username.clone();
        stored.email = account.email.clone();
        stored.hashed_password = account.hashed_password.clone();
        stored.disabled = account.disabled;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.inner.write().await.accounts.remove(&id).is_some())
    }
}
