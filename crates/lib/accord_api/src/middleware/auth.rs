//! Authentication middleware: bearer token extraction and account resolution.

use accord_core::models::account::Account;
use accord_core::models::auth::TokenClaims;
use axum::http::header::AUTHORIZATION;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::AppState;
use crate::error::AppError;

/// Verified claims and the live account behind them, stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedAccount {
    pub claims: TokenClaims,
    pub account: Account,
}

/// Axum middleware: extracts `Authorization: Bearer <token>`, resolves it to
/// a live, enabled account and injects `AuthenticatedAccount`.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::InvalidCredentials)?;

    let (claims, account) = state.authenticator.current_account(token).await?;
    request
        .extensions_mut()
        .insert(AuthenticatedAccount { claims, account });

    Ok(next.run(request).await)
}
