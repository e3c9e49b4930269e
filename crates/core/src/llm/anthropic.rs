//! Anthropic Claude backend for [`LlmClient`].
//!
//! Non-streaming structured calls go through `rig-core`'s Anthropic
//! provider, mirroring `ClaudeClient` (`kernel/ai.rs`). Streaming
//! completions talk to the Messages API directly over `reqwest` so token
//! deltas can be forwarded to the caller as they arrive — the same
//! tradeoff `firecrawl_client.rs` made when it replaced the `firecrawl`
//! SDK with direct HTTP calls to get the noisy abstraction out of the way.

use async_trait::async_trait;
use futures::StreamExt;
use rig::completion::Prompt;
use rig::providers::anthropic;
use tokio::sync::mpsc;

use super::{with_backoff, CallOptions, LlmClient};

const DEFAULT_MODEL: &str = anthropic::CLAUDE_3_5_SONNET;
const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicLlmClient {
    agent_client: anthropic::Client,
    http: reqwest::Client,
    api_key: String,
}

impl AnthropicLlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            agent_client: anthropic::ClientBuilder::new(&api_key).build(),
            http: reqwest::Client::new(),
            api_key,
        }
    }

    fn json_instructions(schema: &serde_json::Value) -> String {
        format!(
            "Respond with JSON only, matching this schema exactly. \
             Do not include markdown fences, a \"json\" prefix, or any \
             explanatory text before or after the JSON.\n\nSchema:\n{}",
            serde_json::to_string_pretty(schema).unwrap_or_default()
        )
    }
}

#[async_trait]
impl LlmClient for AnthropicLlmClient {
    async fn call_structured(
        &self,
        user_prompt: &str,
        schema: serde_json::Value,
        opts: CallOptions,
    ) -> anyhow::Result<serde_json::Value> {
        let preamble = format!("{}\n\n{}", opts.system_prompt, Self::json_instructions(&schema));

        with_backoff(|| async {
            let agent = self
                .agent_client
                .agent(DEFAULT_MODEL)
                .preamble(&preamble)
                .temperature(opts.temperature)
                .max_tokens(opts.max_tokens as u64)
                .build();

            let response = agent
                .prompt(user_prompt)
                .await
                .map_err(|e| anyhow::anyhow!("Anthropic structured call failed: {e}"))?;

            let cleaned = strip_code_fences(&response);
            serde_json::from_str(cleaned)
                .map_err(|e| anyhow::anyhow!("Failed to parse structured response as JSON: {e}"))
        })
        .await
    }

    async fn stream_completion(
        &self,
        user_prompt: &str,
        opts: CallOptions,
        on_chunk: mpsc::UnboundedSender<String>,
    ) -> anyhow::Result<String> {
        with_backoff(|| async {
            let body = serde_json::json!({
                "model": DEFAULT_MODEL,
                "max_tokens": opts.max_tokens,
                "temperature": opts.temperature,
                "system": opts.system_prompt,
                "stream": true,
                "messages": [{"role": "user", "content": user_prompt}],
            });

            let response = self
                .http
                .post(MESSAGES_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await
                .map_err(|e| anyhow::anyhow!("Anthropic streaming request failed: {e}"))?;

            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                anyhow::bail!("Anthropic API error {status}: {text}");
            }

            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();
            let mut full_text = String::new();

            while let Some(chunk) = byte_stream.next().await {
                let bytes = chunk.map_err(|e| anyhow::anyhow!("stream read error: {e}"))?;
                buffer.push_str(&String::from_utf8_lossy(&bytes));

                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim().to_string();
                    buffer.drain(..=pos);
                    if line.is_empty() {
                        continue;
                    }
                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    if let Some(delta) = parse_content_block_delta(data) {
                        full_text.push_str(&delta);
                        // Non-blocking forward: an unbounded channel never
                        // stalls token consumption waiting on a slow
                        // downstream consumer.
                        let _ = on_chunk.send(delta);
                    }
                }
            }

            Ok(full_text)
        })
        .await
    }
}

/// Extract `delta.text` from a `content_block_delta` SSE payload, if
/// present. Any other event type (message_start, ping, message_stop, ...)
/// yields `None`.
fn parse_content_block_delta(data: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(data).ok()?;
    if value.get("type")?.as_str()? != "content_block_delta" {
        return None;
    }
    value
        .get("delta")?
        .get("text")?
        .as_str()
        .map(|s| s.to_string())
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|s| s.trim_end_matches("```").trim())
        .unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_content_block_delta() {
        let data = r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hello"}}"#;
        assert_eq!(parse_content_block_delta(data), Some("Hello".to_string()));
    }

    #[test]
    fn ignores_other_event_types() {
        let data = r#"{"type":"message_start","message":{}}"#;
        assert_eq!(parse_content_block_delta(data), None);
    }

    #[test]
    fn strips_markdown_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
    }
}
