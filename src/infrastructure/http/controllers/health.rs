use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}

/// GET /api/v1/health - Liveness probe
pub async fn get_health() -> Json<HealthStatus> {
    Json(HealthStatus { status: "ok" })
}
