//! # accord_core
//!
//! Core domain logic for Accord: the account model, the persistence contract,
//! password hashing, bearer tokens and federated (OAuth2 / OIDC) login.

pub mod auth;
pub mod config;
pub mod models;
pub mod oauth;
pub mod store;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
