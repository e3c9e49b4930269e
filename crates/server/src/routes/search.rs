//! `GET /api/search` — plan + first-pass hits, no extraction/ranking (§6.1).

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use engine_core::types::{Plan, SearchHit};

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct SearchQuery {
    q: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    plan: Plan,
    results: Vec<SearchHit>,
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    if query.q.trim().is_empty() {
        return Err(ApiError::bad_request("q must not be empty"));
    }

    let (plan, hits) = state.pipeline.plan_and_search(&query.q).await;
    let results = hits.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "search exhausted for /api/search");
        Vec::new()
    });

    Ok(Json(SearchResponse { plan, results }))
}
