//! Liveness probe.

use axum::Json;

use crate::models::HealthResponse;

/// `GET /health`: Always 200 while the process serves requests.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: accord_core::version(),
    })
}
