//! Query decomposition types.

use serde::{Deserialize, Serialize};

/// A single search string derived from the user's query. Never empty.
pub type SubQuery = String;

/// How a `Plan` was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStrategy {
    /// The planner LLM produced a valid decomposition.
    Llm,
    /// The LLM call or schema validation failed; degraded to one sub-query.
    Fallback,
}

/// A query decomposed into 1-5 sub-queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub original_query: String,
    pub sub_queries: Vec<SubQuery>,
    pub strategy: PlanStrategy,
}

impl Plan {
    /// Build the degraded single-sub-query fallback plan for `query`.
    pub fn fallback(query: impl Into<String>) -> Self {
        let query = query.into();
        Self {
            sub_queries: vec![query.clone()],
            original_query: query,
            strategy: PlanStrategy::Fallback,
        }
    }
}
