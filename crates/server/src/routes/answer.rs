//! `POST /api/answer` — the full pipeline, streamed as SSE (§6.1).
//!
//! Built on `stream_handler` (`server/routes/stream.rs`): subscribe,
//! wrap a `BroadcastStream`/here an `UnboundedReceiverStream`,
//! map each value onto an `Event`, keep the connection alive. The
//! orchestrator runs in its own task so a slow or disconnected client never
//! blocks pipeline progress.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;

use engine_core::orchestrator::OrchestratorEvent;
use engine_core::types::Plan;

use crate::app::AppState;

#[derive(Deserialize)]
pub struct AnswerRequest {
    query: String,
    #[serde(rename = "userId")]
    user_id: Option<String>,
    plan: Option<Plan>,
}

/// Translates one [`OrchestratorEvent`] onto the `{type, data}` wire shape
/// of §6.1.
fn wire_frame(event: &OrchestratorEvent) -> serde_json::Value {
    match event {
        OrchestratorEvent::Progress { stage, message } => {
            json!({ "type": "progress", "data": { "stage": stage, "message": message } })
        }
        OrchestratorEvent::Chunk(text) => json!({ "type": "chunk", "data": text }),
        OrchestratorEvent::Complete(packet) => json!({ "type": "complete", "data": packet }),
        OrchestratorEvent::Error { error, message } => {
            json!({ "type": "error", "data": { "error": error, "message": message } })
        }
    }
}

pub async fn answer_handler(
    State(state): State<AppState>,
    Json(request): Json<AnswerRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let query_id = uuid::Uuid::new_v4().to_string();
    let (tx, rx) = mpsc::unbounded_channel::<OrchestratorEvent>();
    let (_cancel_tx, cancel_rx) = watch::channel(false);

    let pipeline = state.pipeline.clone();
    tokio::spawn(async move {
        pipeline
            .run_with_plan(request.query, query_id, request.user_id, request.plan, tx, cancel_rx)
            .await;
    });

    let stream = UnboundedReceiverStream::new(rx)
        .map(|event| Ok::<_, Infallible>(Event::default().data(wire_frame(&event).to_string())));

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
