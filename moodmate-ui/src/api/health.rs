//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub backend_url: String,
    pub uptime_secs: i64,
}

/// GET /health
///
/// Reports this front end only; the backend is not contacted.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "moodmate-ui".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend_url: state.backend.base_url().to_string(),
        uptime_secs: (chrono::Utc::now() - state.startup_time).num_seconds(),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
