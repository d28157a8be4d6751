//! Account CRUD handlers.

use accord_core::models::account::{AccountPatch, NewAccount};
use accord_core::models::auth::TokenClaims;
use accord_core::store::StoreError;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use tracing::{debug, info};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedAccount;
use crate::models::{AccountResponse, CreateAccountRequest};

fn not_found() -> AppError {
    AppError::NotFound("Account not found".into())
}

fn username_conflict(e: StoreError) -> AppError {
    match e {
        StoreError::UniqueViolation(_) => AppError::Conflict("Username unavailable".into()),
        other => other.into(),
    }
}

/// `GET /accounts`
pub async fn list_accounts_handler(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<AccountResponse>>> {
    let accounts = state.authenticator.store().list().await?;
    Ok(Json(accounts.into_iter().map(Into::into).collect()))
}

/// `GET /accounts/{id}`
pub async fn get_account_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<AccountResponse>> {
    let account = state
        .authenticator
        .store()
        .get_by_id(id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(account.into()))
}

/// `GET /accounts/me`: Claims of the presented bearer token.
pub async fn me_handler(
    Extension(auth): Extension<AuthenticatedAccount>,
) -> Json<TokenClaims> {
    Json(auth.claims)
}

/// `POST /accounts`
pub async fn create_account_handler(
    State(state): State<AppState>,
    Json(body): Json<CreateAccountRequest>,
) -> AppResult<(StatusCode, Json<AccountResponse>)> {
    let new = match body.password.as_deref() {
        Some(password) => NewAccount::with_password(&body.username, Some(&body.email), password)?,
        None => NewAccount::without_password(&body.username, &body.email)?,
    };
    let account = state
        .authenticator
        .store()
        .create(new)
        .await
        .map_err(username_conflict)?;
    info!(account_id = account.id, "account created");
    Ok((StatusCode::CREATED, Json(account.into())))
}

/// Callers may only modify their own account; any other id reads as absent.
fn ensure_own(auth: &AuthenticatedAccount, id: i64) -> AppResult<()> {
    if auth.account.id != id {
        debug!(caller = auth.account.id, target = id, "refused change to another account");
        return Err(not_found());
    }
    Ok(())
}

/// `PATCH /accounts/{id}`: Merge the provided fields.
pub async fn update_account_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedAccount>,
    Path(id): Path<i64>,
    Json(patch): Json<AccountPatch>,
) -> AppResult<Json<AccountResponse>> {
    ensure_own(&auth, id)?;
    let store = state.authenticator.store();
    let mut account = store.get_by_id(id).await?.ok_or_else(not_found)?;
    if patch.is_empty() {
        return Ok(Json(account.into()));
    }
    patch.apply(&mut account)?;
    let account = store.update(&account).await.map_err(|e| match e {
        StoreError::NotFound => not_found(),
        other => username_conflict(other),
    })?;
    info!(account_id = account.id, "account updated");
    Ok(Json(account.into()))
}

/// `DELETE /accounts/{id}`
pub async fn delete_account_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedAccount>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    ensure_own(&auth, id)?;
    if !state.authenticator.store().delete(id).await? {
        return Err(not_found());
    }
    info!(account_id = id, "account deleted");
    Ok(StatusCode::NO_CONTENT)
}
