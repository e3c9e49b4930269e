//! Query decomposition into sub-queries (§4.1).
//!
//! Built on the `LlmRequest` builder (`kernel/llm_request.rs`): a
//! schema-constrained call, with validation failure degrading to a
//! fallback plan rather than raising.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::Deserialize;

use crate::llm::{CallOptions, LlmClient, StructuredOutput};
use crate::types::{Plan, PlanStrategy};

const TEMPERATURE: f64 = 0.15;
const MAX_TOKENS: u32 = 512;
const MIN_SUB_QUERIES: usize = 2;
const MAX_SUB_QUERIES: usize = 5;

const SYSTEM_PROMPT: &str = "You decompose a user's question into 2 to 5 independent web \
    search queries that together would surface the information needed to answer it. Queries \
    must be non-empty and should not duplicate each other.";

#[derive(Debug, Deserialize, JsonSchema)]
struct PlannerResponse {
    sub_queries: Vec<String>,
}

/// Decomposes a raw query into a [`Plan`]. Never fails the caller: any LLM,
/// transport, or validation failure degrades to [`Plan::fallback`].
pub struct QueryPlanner {
    llm: Arc<dyn LlmClient>,
}

impl QueryPlanner {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn plan(&self, query: &str) -> Plan {
        match self.try_plan(query).await {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(query, error = %e, "query planning failed, falling back");
                Plan::fallback(query)
            }
        }
    }

    async fn try_plan(&self, query: &str) -> anyhow::Result<Plan> {
        let opts = CallOptions {
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            system_prompt: SYSTEM_PROMPT.to_string(),
        };

        let value = self
            .llm
            .call_structured(query, PlannerResponse::json_schema_value(), opts)
            .await?;
        let response: PlannerResponse = serde_json::from_value(value)?;

        let sub_queries: Vec<String> = response
            .sub_queries
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .collect();

        if sub_queries.len() < MIN_SUB_QUERIES || sub_queries.len() > MAX_SUB_QUERIES {
            anyhow::bail!(
                "planner returned {} sub-queries, expected {}-{}",
                sub_queries.len(),
                MIN_SUB_QUERIES,
                MAX_SUB_QUERIES
            );
        }

        Ok(Plan {
            original_query: query.to_string(),
            sub_queries,
            strategy: PlanStrategy::Llm,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    struct StubLlm(serde_json::Value);

    #[async_trait]
    impl LlmClient for StubLlm {
        async fn call_structured(
            &self,
            _user_prompt: &str,
            _schema: serde_json::Value,
            _opts: CallOptions,
        ) -> anyhow::Result<serde_json::Value> {
            Ok(self.0.clone())
        }

        async fn stream_completion(
            &self,
            _user_prompt: &str,
            _opts: CallOptions,
            _on_chunk: mpsc::UnboundedSender<String>,
        ) -> anyhow::Result<String> {
            unimplemented!("not exercised by planner tests")
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl LlmClient for FailingLlm {
        async fn call_structured(
            &self,
            _user_prompt: &str,
            _schema: serde_json::Value,
            _opts: CallOptions,
        ) -> anyhow::Result<serde_json::Value> {
            anyhow::bail!("simulated transport failure")
        }

        async fn stream_completion(
            &self,
            _user_prompt: &str,
            _opts: CallOptions,
            _on_chunk: mpsc::UnboundedSender<String>,
        ) -> anyhow::Result<String> {
            unimplemented!("not exercised by planner tests")
        }
    }

    #[tokio::test]
    async fn plan_bounds_respected_on_success() {
        let response = serde_json::json!({"sub_queries": ["a", "b", "c"]});
        let planner = QueryPlanner::new(Arc::new(StubLlm(response)));
        let plan = planner.plan("original").await;
        assert_eq!(plan.strategy, PlanStrategy::Llm);
        assert!(plan.sub_queries.len() >= 1 && plan.sub_queries.len() <= 5);
    }

    #[tokio::test]
    async fn falls_back_on_llm_failure() {
        let planner = QueryPlanner::new(Arc::new(FailingLlm));
        let plan = planner.plan("original query").await;
        assert_eq!(plan.strategy, PlanStrategy::Fallback);
        assert_eq!(plan.sub_queries, vec!["original query".to_string()]);
    }

    #[tokio::test]
    async fn falls_back_on_too_few_sub_queries() {
        let response = serde_json::json!({"sub_queries": ["only one"]});
        let planner = QueryPlanner::new(Arc::new(StubLlm(response)));
        let plan = planner.plan("original").await;
        assert_eq!(plan.strategy, PlanStrategy::Fallback);
    }

    #[tokio::test]
    async fn falls_back_on_malformed_json() {
        let planner = QueryPlanner::new(Arc::new(StubLlm(serde_json::json!({"nope": 1}))));
        let plan = planner.plan("original").await;
        assert_eq!(plan.strategy, PlanStrategy::Fallback);
    }
}
