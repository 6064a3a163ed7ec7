//! Health check endpoint

use axum::{routing::get, Json, Router};
use lyric_common::api::ApiResponse;
use serde::Serialize;

use crate::AppState;

/// Health check payload
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

/// GET /health
pub async fn health_check() -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "ok".to_string(),
        module: "lyric-player".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
