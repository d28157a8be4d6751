//! # accord_api
//!
//! HTTP API library for Accord.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use accord_core::auth::{AuthError, Authenticator};
use accord_core::store::AccountStore;
use axum::Router;
use axum::routing::{get, patch, post};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{accounts, auth, health, oauth};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub authenticator: Arc<Authenticator>,
    /// API configuration.
    pub config: ApiConfig,
}

impl AppState {
    /// Build the authenticator over `store` from `config`.
    pub fn new(config: ApiConfig, store: Arc<dyn AccountStore>) -> Result<Self, AuthError> {
        let authenticator = Authenticator::new(&config.auth, store)?;
        Ok(Self {
            authenticator: Arc::new(authenticator),
            config,
        })
    }
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public = Router::new()
        .route("/health", get(health::health_handler))
        .route("/signup", post(auth::signup_handler))
        .route("/login", post(auth::login_handler))
        .route("/token", post(auth::login_handler))
        .route("/login/{provider}", get(oauth::login_redirect_handler))
        .route("/auth/{provider}", get(oauth::callback_handler))
        .route(
            "/accounts",
            get(accounts::list_accounts_handler).post(accounts::create_account_handler),
        )
        .route("/accounts/{id}", get(accounts::get_account_handler));

    // Protected routes (require a bearer token)
    let protected = Router::new()
        .route("/accounts/me", get(accounts::me_handler))
        .route(
            "/accounts/{id}",
            patch(accounts::update_account_handler).delete(accounts::delete_account_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
