//! Liveness check (§6.1). No dependency checks of its own — this process
//! holds no database connection, unlike `health_handler`
//! (`server/routes/health.rs`), so there's nothing to probe but itself.

use axum::Json;
use chrono::Utc;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    ok: bool,
    timestamp: String,
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        timestamp: Utc::now().to_rfc3339(),
    })
}
