//! Password signup and login handlers.

use accord_core::models::auth::IssuedToken;
use axum::extract::State;
use axum::{Form, Json};

use crate::AppState;
use crate::error::AppResult;
use crate::models::CredentialsForm;

/// `POST /signup`: Create a password account and return its first token.
pub async fn signup_handler(
    State(state): State<AppState>,
    Form(form): Form<CredentialsForm>,
) -> AppResult<Json<IssuedToken>> {
    let issued = state
        .authenticator
        .signup(&form.username, form.email.as_deref(), &form.password)
        .await?;
    Ok(Json(issued))
}

/// `POST /login`, `POST /token`: Exchange username and password for a token.
pub async fn login_handler(
    State(state): State<AppState>,
    Form(form): Form<CredentialsForm>,
) -> AppResult<Json<IssuedToken>> {
    let issued = state
        .authenticator
        .login(&form.username, &form.password)
        .await?;
    Ok(Json(issued))
}
