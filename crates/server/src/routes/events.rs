//! `POST /api/events` and `GET /api/events` (§6.1).
//!
//! Ingest is best-effort by design (§7): a malformed `meta` never produces a
//! 4xx, it's logged and dropped while the rest of the event is still
//! recorded. Only a missing/empty `userId` on ingest is rejected outright,
//! since there's nowhere to file the event without one.

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use engine_core::types::{UserEvent, UserEventPayload};

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct IngestResponse {
    success: bool,
}

pub async fn ingest_handler(
    State(state): State<AppState>,
    Json(payload): Json<UserEventPayload>,
) -> Result<Json<IngestResponse>, ApiError> {
    if payload.user_id.trim().is_empty() {
        return Err(ApiError::bad_request("userId must not be empty"));
    }

    state.pipeline.events().ingest(payload, Utc::now().timestamp_millis()).await;
    Ok(Json(IngestResponse { success: true }))
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(rename = "userId")]
    user_id: String,
}

pub async fn list_handler(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<UserEvent>> {
    Json(state.pipeline.events().events_for_user(&query.user_id).await)
}
