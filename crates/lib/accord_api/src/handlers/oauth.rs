//! Federated login: provider redirect and callback.

use accord_core::auth::authenticator::CallbackParams;
use accord_core::models::auth::IssuedToken;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::Redirect;
use axum_extra::extract::cookie::CookieJar;

use crate::AppState;
use crate::error::AppResult;
use crate::services::cookies;

/// `GET /login/{provider}`: Send the caller to the provider, binding a
/// fresh nonce to their browser.
pub async fn login_redirect_handler(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Redirect)> {
    let redirect = state.authenticator.begin_oauth(&provider)?;
    let jar = jar.add(cookies::nonce_cookie(
        &redirect.nonce,
        state.config.env.is_prod(),
    ));
    Ok((jar, Redirect::to(redirect.url.as_str())))
}

/// `GET /auth/{provider}`: Provider callback. The nonce cookie is cleared
/// whatever the outcome.
pub async fn callback_handler(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
    jar: CookieJar,
) -> (CookieJar, AppResult<Json<IssuedToken>>) {
    let session_nonce = jar
        .get(cookies::NONCE_COOKIE)
        .map(|c| c.value().to_string());
    let result: AppResult<Json<IssuedToken>> = state
        .authenticator
        .complete_oauth(&provider, params, session_nonce.as_deref())
        .await
        .map(Json)
        .map_err(Into::into);
    let jar = jar.add(cookies::clear_nonce_cookie(state.config.env.is_prod()));
    (jar, result)
}
