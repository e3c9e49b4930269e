//! `GET`/`DELETE /api/preferences` (§6.1).

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::app::AppState;

const TOP_ARMS: usize = 5;

#[derive(Deserialize)]
pub struct PreferencesQuery {
    #[serde(rename = "userId")]
    user_id: String,
}

#[derive(Serialize)]
pub struct ArmScore {
    arm: String,
    score: f64,
}

#[derive(Serialize)]
pub struct PreferencesResponse {
    #[serde(rename = "topArms")]
    top_arms: Vec<ArmScore>,
    #[serde(rename = "totalInteractions")]
    total_interactions: f64,
}

pub async fn get_handler(
    State(state): State<AppState>,
    Query(query): Query<PreferencesQuery>,
) -> Json<PreferencesResponse> {
    let bandit = state.pipeline.events().bandit();
    let top_arms = bandit
        .top_k(&query.user_id, TOP_ARMS)
        .await
        .into_iter()
        .map(|(arm, score)| ArmScore { arm, score })
        .collect();
    let total_interactions = bandit.total_interactions(&query.user_id).await;

    Json(PreferencesResponse { top_arms, total_interactions })
}

#[derive(Serialize)]
pub struct OkResponse {
    ok: bool,
}

pub async fn delete_handler(
    State(state): State<AppState>,
    Query(query): Query<PreferencesQuery>,
) -> Json<OkResponse> {
    state.pipeline.events().reset(&query.user_id).await;
    Json(OkResponse { ok: true })
}
