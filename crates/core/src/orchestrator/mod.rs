//! Sequences one request through the full pipeline, emitting progress and
//! exactly one terminal event (§4.11).

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, watch};

use crate::bandit::DEFAULT_PENDING_TIMEOUT_MS;
use crate::error::EngineError;
use crate::events::EventStore;
use crate::extract::{self, PageExtractor};
use crate::llm::LlmClient;
use crate::planner::QueryPlanner;
use crate::rank::{MatchedDoc, Ranker};
use crate::search::ParallelSearcher;
use crate::synthesize::Synthesizer;
use crate::tagger::FeatureTagger;
use crate::types::{AnswerPacket, PageExtract, Plan, RankedDoc};

const TOP_DOCS_FOR_SYNTHESIS: usize = 8;
const TOP_DOCS_FOR_IMPRESSIONS: usize = 8;

/// One frame of the stream a request produces. The server layer maps these
/// onto the SSE frame shapes of §6.1 verbatim.
#[derive(Debug, Clone)]
pub enum OrchestratorEvent {
    Progress { stage: &'static str, message: Option<String> },
    Chunk(String),
    Complete(AnswerPacket),
    Error { error: String, message: String },
}

pub struct Pipeline {
    planner: QueryPlanner,
    searcher: ParallelSearcher,
    extractor: Arc<PageExtractor>,
    tagger: FeatureTagger,
    synthesizer: Synthesizer,
    events: EventStore,
}

impl Pipeline {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        searcher: ParallelSearcher,
        events: EventStore,
    ) -> Self {
        Self {
            planner: QueryPlanner::new(llm.clone()),
            searcher,
            extractor: Arc::new(PageExtractor::new()),
            tagger: FeatureTagger::new(llm.clone()),
            synthesizer: Synthesizer::new(llm),
            events,
        }
    }

    pub fn events(&self) -> &EventStore {
        &self.events
    }

    /// Plan + first-pass search only, for `GET /api/search`. Does not
    /// extract, tag, rank, or synthesize.
    pub async fn plan_and_search(&self, query: &str) -> (Plan, anyhow::Result<Vec<crate::types::SearchHit>>) {
        let plan = self.planner.plan(query).await;
        let hits = self.searcher.run(query, &plan.sub_queries).await;
        (plan, hits)
    }

    /// Run one request to completion, emitting frames through `tx`.
    /// `cancel` flips to `true` to request early termination: no new
    /// external calls are issued and no `complete` frame is emitted once
    /// cancellation is observed.
    pub async fn run(
        &self,
        query: String,
        query_id: String,
        user_id: Option<String>,
        tx: mpsc::UnboundedSender<OrchestratorEvent>,
        cancel: watch::Receiver<bool>,
    ) {
        self.run_with_plan(query, query_id, user_id, None, tx, cancel).await
    }

    /// As [`Self::run`], but accepts a caller-supplied `Plan` (the optional
    /// `plan` field of `POST /api/answer`, §6.1) that skips the planning
    /// step entirely when present.
    pub async fn run_with_plan(
        &self,
        query: String,
        query_id: String,
        user_id: Option<String>,
        plan_override: Option<Plan>,
        tx: mpsc::UnboundedSender<OrchestratorEvent>,
        mut cancel: watch::Receiver<bool>,
    ) {
        if *cancel.borrow() {
            return;
        }

        if let Some(user_id) = &user_id {
            self.events
                .bandit()
                .resolve_pending_impressions(user_id, Utc::now().timestamp_millis())
                .await;
        }

        let plan: Plan = match plan_override {
            Some(plan) => plan,
            None => {
                let _ = tx.send(OrchestratorEvent::Progress { stage: "planning", message: None });
                self.planner.plan(&query).await
            }
        };
        if *cancel.borrow() {
            return;
        }

        let _ = tx.send(OrchestratorEvent::Progress { stage: "searching", message: None });
        let hits = match self.searcher.run(&query, &plan.sub_queries).await {
            Ok(hits) => hits,
            Err(e) => {
                let err = EngineError::SearchExhausted;
                tracing::warn!(cause = %e, "{}", err);
                let _ = tx.send(OrchestratorEvent::Error {
                    error: err.code().to_string(),
                    message: err.to_string(),
                });
                return;
            }
        };
        if *cancel.borrow() {
            return;
        }

        let targets: Vec<(String, Option<String>)> = hits
            .iter()
            .map(|h| (h.url.clone(), h.published_hint.clone()))
            .collect();
        let pages: Vec<PageExtract> =
            extract::extract_all(self.extractor.clone(), self.tagger.clone(), targets).await;
        if *cancel.borrow() {
            return;
        }

        let _ = tx.send(OrchestratorEvent::Progress { stage: "analyzing", message: None });
        let matched: Vec<MatchedDoc<'_>> = hits
            .iter()
            .filter_map(|hit| {
                pages
                    .iter()
                    .find(|p| p.url == hit.url)
                    .map(|page| MatchedDoc { hit, page })
            })
            .collect();
        let ranker = Ranker::new(&matched);
        let mut ranked: Vec<RankedDoc> = ranker.rank(&query, &matched);

        if let Some(user_id) = &user_id {
            ranked = crate::personalize::Personalizer::new(self.events.bandit())
                .personalize(user_id, ranked)
                .await;

            let now_ms = Utc::now().timestamp_millis();
            for doc in ranked.iter().take(TOP_DOCS_FOR_IMPRESSIONS) {
                if let Some(features) = doc.features {
                    self.events
                        .record_impression(
                            user_id,
                            features.arms().to_vec(),
                            query_id.clone(),
                            doc.id.clone(),
                            now_ms,
                        )
                        .await;
                }
            }
        }
        if *cancel.borrow() {
            return;
        }

        let top_sources: Vec<RankedDoc> = ranked.into_iter().take(TOP_DOCS_FOR_SYNTHESIS).collect();

        let _ = tx.send(OrchestratorEvent::Progress { stage: "synthesizing", message: None });
        let (chunk_tx, mut chunk_rx) = mpsc::unbounded_channel::<String>();
        let forward_tx = tx.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(chunk) = chunk_rx.recv().await {
                if forward_tx.send(OrchestratorEvent::Chunk(chunk)).is_err() {
                    break;
                }
            }
        });

        let synthesis = self.synthesizer.synthesize(&query, &query_id, &top_sources, chunk_tx);
        tokio::select! {
            result = synthesis => {
                let _ = forwarder.await;
                match result {
                    Ok(packet) if !*cancel.borrow() => {
                        let _ = tx.send(OrchestratorEvent::Complete(packet));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let err = EngineError::SynthesisFailed(e);
                        let _ = tx.send(OrchestratorEvent::Error {
                            error: err.code().to_string(),
                            message: err.to_string(),
                        });
                    }
                }
            }
            _ = cancel.changed() => {
                forwarder.abort();
            }
        }
    }
}

/// Default pending-impression timeout exposed for callers wiring
/// `EventStore`/`Bandit` instances directly.
pub const PENDING_IMPRESSION_TIMEOUT_MS: i64 = DEFAULT_PENDING_TIMEOUT_MS;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{NoopSearchClient, SearchClient};
    use async_trait::async_trait;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct StubLlm;

    #[async_trait]
    impl LlmClient for StubLlm {
        async fn call_structured(
            &self,
            _user_prompt: &str,
            _schema: serde_json::Value,
            _opts: crate::llm::CallOptions,
        ) -> anyhow::Result<serde_json::Value> {
            anyhow::bail!("planner forced to fallback in this test")
        }

        async fn stream_completion(
            &self,
            _user_prompt: &str,
            _opts: crate::llm::CallOptions,
            on_chunk: mpsc::UnboundedSender<String>,
        ) -> anyhow::Result<String> {
            let _ = on_chunk.send("No sources were available.".to_string());
            Ok("No sources were available.".to_string())
        }
    }

    async fn drain(mut rx: UnboundedReceiver<OrchestratorEvent>) -> Vec<OrchestratorEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn emits_exactly_one_terminal_event_with_empty_search_results() {
        let llm: Arc<dyn LlmClient> = Arc::new(StubLlm);
        let searcher = ParallelSearcher::new(Arc::new(NoopSearchClient) as Arc<dyn SearchClient>);
        let pipeline = Pipeline::new(llm, searcher, EventStore::new());

        let (tx, rx) = mpsc::unbounded_channel();
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        pipeline
            .run("test query".to_string(), "q1".to_string(), None, tx.clone(), cancel_rx)
            .await;
        drop(tx);

        let events = drain(rx).await;
        let terminal_count = events
            .iter()
            .filter(|e| matches!(e, OrchestratorEvent::Complete(_) | OrchestratorEvent::Error { .. }))
            .count();
        assert_eq!(terminal_count, 1);
    }

    #[tokio::test]
    async fn cancellation_before_start_emits_nothing() {
        let llm: Arc<dyn LlmClient> = Arc::new(StubLlm);
        let searcher = ParallelSearcher::new(Arc::new(NoopSearchClient) as Arc<dyn SearchClient>);
        let pipeline = Pipeline::new(llm, searcher, EventStore::new());

        let (tx, rx) = mpsc::unbounded_channel();
        let (_cancel_tx, cancel_rx) = watch::channel(true);
        pipeline
            .run("test query".to_string(), "q1".to_string(), None, tx.clone(), cancel_rx)
            .await;
        drop(tx);

        let events = drain(rx).await;
        assert!(events.is_empty());
    }
}
