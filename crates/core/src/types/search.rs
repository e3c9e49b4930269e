//! Search hit types.

use serde::{Deserialize, Serialize};

/// Where a hit came from: which sub-query found it, and at what rank.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub source_query: String,
    pub original_rank: usize,
}

/// A single normalized search result.
///
/// `id` is a stable hash of the *normalized* URL (see
/// [`crate::search::normalize_url`]) so duplicates across sub-queries
/// collapse to one id regardless of scheme/`www.`/trailing-slash variance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: String,
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub domain: String,
    pub published_hint: Option<String>,
    pub provenance: Provenance,
}
