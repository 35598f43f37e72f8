//! HTTP Handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::assets::bundle_present;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub bundle_present: bool,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        bundle_present: bundle_present(&state.dist_dir),
    })
}
