//! Health check endpoint

use axum::Json;
use chrono::Utc;

use common::HealthResponse;

use crate::ApiResult;

/// GET /health
pub async fn health_check() -> ApiResult<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}
