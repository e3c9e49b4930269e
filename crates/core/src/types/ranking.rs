//! Ranked document types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::features::ContentFeatures;

/// The four component signals that make up a document's score, each in
/// `[0, 1]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signals {
    pub relevance: f64,
    pub recency: f64,
    pub source_quality: f64,
    pub coverage: f64,
}

/// A document after ranking (and, if a user is present, personalization).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedDoc {
    pub id: String,
    pub url: String,
    pub title: String,
    pub excerpt: String,
    pub domain: String,
    pub published_date: Option<DateTime<Utc>>,
    pub features: Option<ContentFeatures>,
    pub signals: Signals,
    pub score: f64,
    pub ranking_reason: String,
}
