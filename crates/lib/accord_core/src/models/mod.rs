//! Domain models.
//!
//! Internal types, distinct from the HTTP request/response shapes in `accord_api`.

pub mod account;
pub mod auth;
