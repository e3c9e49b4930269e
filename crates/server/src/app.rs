//! Application setup: shared state and router assembly, mirroring
//! `build_app` (`server/app.rs`) stripped of everything that doesn't
//! belong to this surface (no GraphQL, no Postgres, no auth).

use std::sync::Arc;

use axum::http::{header::CONTENT_TYPE, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use engine_core::search::{NoopSearchClient, ParallelSearcher, SearchClient, TavilySearchClient};
use engine_core::{Config, EventStore, Pipeline};
use engine_core::llm::{anthropic::AnthropicLlmClient, LlmClient, NoopLlmClient};

use crate::routes;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

fn build_llm(config: &Config) -> Arc<dyn LlmClient> {
    match &config.llm_api_key {
        Some(key) => Arc::new(AnthropicLlmClient::new(key.clone())),
        None => {
            tracing::warn!("LLM_API_KEY unset, using NoopLlmClient (planner/tagger fallback only)");
            Arc::new(NoopLlmClient)
        }
    }
}

fn build_search(config: &Config) -> Arc<dyn SearchClient> {
    match &config.search_api_key {
        Some(key) => Arc::new(TavilySearchClient::new(key.clone())),
        None => {
            tracing::warn!("SEARCH_API_KEY unset, using NoopSearchClient (empty results)");
            Arc::new(NoopSearchClient)
        }
    }
}

/// Build the axum application router and its shared state.
pub fn build_app(config: &Config) -> Router {
    let llm = build_llm(config);
    let searcher = ParallelSearcher::new(build_search(config));
    let events = EventStore::new();
    let pipeline = Arc::new(Pipeline::new(llm, searcher, events));

    let state = AppState { pipeline };

    let cors = CorsLayer::new()
        .allow_origin(config.web_origin.parse::<axum::http::HeaderValue>().unwrap_or_else(|_| {
            axum::http::HeaderValue::from_static("http://localhost:5173")
        }))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/health", get(routes::health::health_handler))
        .route("/api/search", get(routes::search::search_handler))
        .route("/api/answer", post(routes::answer::answer_handler))
        .route(
            "/api/events",
            post(routes::events::ingest_handler).get(routes::events::list_handler),
        )
        .route(
            "/api/preferences",
            get(routes::preferences::get_handler).delete(routes::preferences::delete_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
