//! Append-only event log + per-user bandit registry + lifecycle (§4.9, §9).
//!
//! One owned value with an explicit lifecycle: construct at startup, mutate
//! under per-user locking, `reset(user_id)` for total deletion — replacing
//! the source's global mutable `eventLog`/`userBandits` maps per the design
//! note in SPEC_FULL.md §9.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::bandit::Bandit;
use crate::types::{EventMeta, EventType, UserEvent, UserEventPayload};

/// Owns the append-only event log and the bandit registry it feeds.
#[derive(Clone)]
pub struct EventStore {
    events: Arc<RwLock<Vec<UserEvent>>>,
    bandit: Bandit,
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            bandit: Bandit::new(),
        }
    }

    pub fn bandit(&self) -> &Bandit {
        &self.bandit
    }

    /// Validate `meta` against the closed union and append the event.
    /// Unknown/malformed `meta` keys are dropped (event still appended)
    /// rather than rejecting the request — event intake is best-effort
    /// (§7).
    pub async fn ingest(&self, payload: UserEventPayload, now_ms: i64) {
        let meta = payload.meta.and_then(|raw| match serde_json::from_value::<EventMeta>(raw) {
            Ok(meta) if !meta.is_empty() => Some(meta),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(error = %e, "dropping unrecognized event meta");
                None
            }
        });

        let event = UserEvent {
            user_id: payload.user_id,
            timestamp_ms: payload.timestamp_ms.unwrap_or(now_ms),
            event_type: payload.event_type,
            source_id: payload.source_id,
            query_id: payload.query_id,
            meta,
        };

        self.apply_to_bandit(&event, now_ms).await;
        self.events.write().await.push(event);
    }

    async fn apply_to_bandit(&self, event: &UserEvent, now_ms: i64) {
        let is_click = matches!(
            event.event_type,
            EventType::SourceClicked | EventType::CitationClicked
        );
        if !is_click {
            return;
        }
        let Some(meta) = &event.meta else { return };
        let Some(features) = meta.features else { return };
        let arms = features.arms().to_vec();
        let source_id = event.source_id.clone().unwrap_or_default();

        self.bandit.record_click(&event.user_id, &arms, Some(source_id.as_str())).await;
        let _ = now_ms;
    }

    /// All events recorded for a user, in append order.
    pub async fn events_for_user(&self, user_id: &str) -> Vec<UserEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Record a new pending impression for a document shown to `user_id`.
    pub async fn record_impression(
        &self,
        user_id: &str,
        arms: Vec<String>,
        query_id: String,
        source_id: String,
        now_ms: i64,
    ) {
        self.bandit
            .record_pending_impression(user_id, arms, query_id, source_id, now_ms)
            .await;
    }

    /// Total deletion of a user's event history and bandit state.
    pub async fn reset(&self, user_id: &str) {
        self.events.write().await.retain(|e| e.user_id != user_id);
        self.bandit.reset(user_id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(user_id: &str, event_type: EventType, meta: Option<serde_json::Value>) -> UserEventPayload {
        UserEventPayload {
            user_id: user_id.to_string(),
            timestamp_ms: Some(0),
            event_type,
            source_id: Some("src1".to_string()),
            query_id: Some("q1".to_string()),
            meta,
        }
    }

    #[tokio::test]
    async fn ingest_appends_to_per_user_log() {
        let store = EventStore::new();
        store.ingest(payload("u1", EventType::AnswerSaved, None), 0).await;
        let events = store.events_for_user("u1").await;
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn click_with_features_credits_bandit_arms() {
        let store = EventStore::new();
        let meta = serde_json::json!({"features": {
            "depth": "expert", "style": "technical", "format": "tutorial",
            "approach": "data-driven", "density": "comprehensive"
        }});
        store
            .ingest(payload("u1", EventType::SourceClicked, Some(meta)), 0)
            .await;
        let scores = store.bandit().scores("u1").await;
        assert!(scores.contains_key("depth:expert"));
    }

    #[tokio::test]
    async fn unrecognized_meta_is_dropped_not_rejected() {
        let store = EventStore::new();
        let meta = serde_json::json!({"totallyUnknownKey": 42});
        store
            .ingest(payload("u1", EventType::AnswerSaved, Some(meta)), 0)
            .await;
        let events = store.events_for_user("u1").await;
        assert_eq!(events.len(), 1);
        assert!(events[0].meta.is_none());
    }

    #[tokio::test]
    async fn reset_clears_events_and_bandit() {
        let store = EventStore::new();
        store.ingest(payload("u1", EventType::AnswerSaved, None), 0).await;
        store.reset("u1").await;
        assert!(store.events_for_user("u1").await.is_empty());
        assert!(store.bandit().scores("u1").await.is_empty());
    }

    #[tokio::test]
    async fn per_user_isolation_across_events_and_bandit() {
        let store = EventStore::new();
        store.ingest(payload("u1", EventType::AnswerSaved, None), 0).await;
        assert!(store.events_for_user("u2").await.is_empty());
    }
}
