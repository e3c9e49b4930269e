//! LLM-powered content feature tagging (§4.5).

use std::sync::Arc;

use crate::llm::{CallOptions, LlmClient, StructuredOutput};
use crate::types::ContentFeatures;

const TEMPERATURE: f64 = 0.1;
const MAX_TOKENS: u32 = 256;
const BODY_SLICE: usize = 1500;
/// Below this body length the page is too thin to tag with confidence
/// (Open Question resolution, SPEC_FULL.md §9): bypass the LLM call and
/// return the neutral default directly.
const MIN_BODY_LEN_FOR_TAGGING: usize = 200;

const SYSTEM_PROMPT: &str = "You classify web page content along five fixed dimensions. \
    Respond with your best single judgment for each dimension based only on the title and \
    body excerpt provided.";

/// Classifies a page into the fixed 5-tuple of [`ContentFeatures`]. Never
/// fails the caller — falls back to [`ContentFeatures::neutral`] on any LLM
/// or parse error, and bypasses the call entirely for very short bodies.
#[derive(Clone)]
pub struct FeatureTagger {
    llm: Arc<dyn LlmClient>,
}

impl FeatureTagger {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn tag(&self, title: &str, body: &str) -> ContentFeatures {
        if body.len() < MIN_BODY_LEN_FOR_TAGGING {
            tracing::debug!(title, body_len = body.len(), "body too short, skipping tagging");
            return ContentFeatures::neutral();
        }

        let excerpt: String = body.chars().take(BODY_SLICE).collect();
        let user_prompt = format!("Title: {title}\n\nBody:\n{excerpt}");

        let opts = CallOptions {
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            system_prompt: SYSTEM_PROMPT.to_string(),
        };

        match self
            .llm
            .call_structured(&user_prompt, ContentFeatures::json_schema_value(), opts)
            .await
        {
            Ok(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "tagger response failed validation, using neutral default");
                ContentFeatures::neutral()
            }),
            Err(e) => {
                tracing::warn!(error = %e, "tagger LLM call failed, using neutral default");
                ContentFeatures::neutral()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Approach, Density, Depth, Format, Style};
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
            unimplemented!("not exercised by tagger tests")
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
            anyhow::bail!("simulated failure")
        }

        async fn stream_completion(
            &self,
            _user_prompt: &str,
            _opts: CallOptions,
            _on_chunk: mpsc::UnboundedSender<String>,
        ) -> anyhow::Result<String> {
            unimplemented!("not exercised by tagger tests")
        }
    }

    fn long_body() -> String {
        "x".repeat(400)
    }

    #[tokio::test]
    async fn bypasses_llm_for_short_bodies() {
        let tagger = FeatureTagger::new(Arc::new(FailingLlm));
        let result = tagger.tag("title", "too short").await;
        assert_eq!(result, ContentFeatures::neutral());
    }

    #[tokio::test]
    async fn returns_neutral_on_llm_failure() {
        let tagger = FeatureTagger::new(Arc::new(FailingLlm));
        let result = tagger.tag("title", &long_body()).await;
        assert_eq!(result, ContentFeatures::neutral());
    }

    #[tokio::test]
    async fn parses_valid_llm_response() {
        let features = ContentFeatures {
            depth: Depth::Expert,
            style: Style::Technical,
            format: Format::Tutorial,
            approach: Approach::DataDriven,
            density: Density::Comprehensive,
        };
        let value = serde_json::to_value(features).unwrap();
        let tagger = FeatureTagger::new(Arc::new(StubLlm(value)));
        let result = tagger.tag("title", &long_body()).await;
        assert_eq!(result, features);
    }

    #[tokio::test]
    async fn returns_neutral_on_malformed_response() {
        let tagger = FeatureTagger::new(Arc::new(StubLlm(serde_json::json!({"bogus": true}))));
        let result = tagger.tag("title", &long_body()).await;
        assert_eq!(result, ContentFeatures::neutral());
    }
}
