use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// GET /api/resume/health (also served at /health)
/// Liveness only; touches nothing and cannot fail.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        service: "Resume Analysis API",
        timestamp: Utc::now(),
    })
}
