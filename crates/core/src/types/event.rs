//! User interaction event types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::features::ContentFeatures;

/// The kinds of client-emitted interaction events the event store accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    SourceClicked,
    CitationClicked,
    CitationHovered,
    SourceExpanded,
    AnswerSaved,
}

/// Closed union of event metadata. Unknown keys in the wire payload are
/// ignored rather than rejected — event intake is best-effort (§7).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventMeta {
    pub features: Option<ContentFeatures>,
    pub citation_number: Option<u32>,
    pub all_source_features: Option<Vec<ContentFeatures>>,
}

impl EventMeta {
    pub fn is_empty(&self) -> bool {
        self.features.is_none()
            && self.citation_number.is_none()
            && self.all_source_features.is_none()
    }
}

/// One append-only event in the event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEvent {
    pub user_id: String,
    pub timestamp_ms: i64,
    pub event_type: EventType,
    pub source_id: Option<String>,
    pub query_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<EventMeta>,
}

/// Raw event payload as received over the wire, before meta is validated
/// against the closed union above. `meta` here is intentionally
/// `serde_json::Value` so malformed-but-present keys don't reject the whole
/// event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEventPayload {
    pub user_id: String,
    pub timestamp_ms: Option<i64>,
    pub event_type: EventType,
    pub source_id: Option<String>,
    pub query_id: Option<String>,
    #[serde(default)]
    pub meta: Option<Value>,
}
