//! LLM client trait and retry policy (§6.2).
//!
//! Two capabilities: a structured JSON-schema call (used by the planner and
//! feature tagger) and a free-form streaming completion (used by the
//! synthesizer). Both implementations must retry transient failures with
//! exponential backoff before giving up.

pub mod anthropic;
pub mod schema;

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;

pub use schema::StructuredOutput;

/// Parameters shared by both call shapes.
#[derive(Debug, Clone)]
pub struct CallOptions {
    pub temperature: f64,
    pub max_tokens: u32,
    pub system_prompt: String,
}

/// LLM backend seam. Implementations wrap a specific provider and own the
/// retry/backoff policy internally.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Call the model under a JSON-schema constraint, returning the parsed
    /// JSON value. Retries on transient failure or schema mismatch.
    async fn call_structured(
        &self,
        user_prompt: &str,
        schema: serde_json::Value,
        opts: CallOptions,
    ) -> anyhow::Result<serde_json::Value>;

    /// Stream a free-form completion, forwarding each text delta through
    /// `on_chunk` as it arrives, and returning the fully accumulated text.
    async fn stream_completion(
        &self,
        user_prompt: &str,
        opts: CallOptions,
        on_chunk: mpsc::UnboundedSender<String>,
    ) -> anyhow::Result<String>;
}

/// Always-fails LLM client. Lets the server start up without an LLM API key
/// wired: planner and tagger degrade to their fallback paths, and synthesis
/// becomes request-fatal (§7) rather than the process refusing to boot —
/// mirrors [`crate::search::NoopSearchClient`].
pub struct NoopLlmClient;

#[async_trait]
impl LlmClient for NoopLlmClient {
    async fn call_structured(
        &self,
        _user_prompt: &str,
        _schema: serde_json::Value,
        _opts: CallOptions,
    ) -> anyhow::Result<serde_json::Value> {
        anyhow::bail!("no LLM backend configured")
    }

    async fn stream_completion(
        &self,
        _user_prompt: &str,
        _opts: CallOptions,
        _on_chunk: mpsc::UnboundedSender<String>,
    ) -> anyhow::Result<String> {
        anyhow::bail!("no LLM backend configured")
    }
}

/// Retry delays for transient failures: 1s, 2s, 4s (3 attempts total).
pub const BACKOFF_DELAYS_MS: [u64; 3] = [1_000, 2_000, 4_000];

/// Run `f` up to `BACKOFF_DELAYS_MS.len() + 1` times, sleeping the
/// corresponding backoff delay between attempts. The last failure is
/// returned if every attempt fails.
pub async fn with_backoff<T, F, Fut>(mut f: F) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<T>>,
{
    let mut last_err = None;
    for (attempt, delay_ms) in std::iter::once(0)
        .chain(BACKOFF_DELAYS_MS.iter().copied())
        .enumerate()
    {
        if attempt > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::warn!(attempt, error = %e, "LLM call attempt failed");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("LLM call failed with no recorded error")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn with_backoff_returns_first_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let result = with_backoff(|| {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(42)
            }
        })
        .await
        .unwrap();
        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn with_backoff_gives_up_after_all_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let result: anyhow::Result<()> = with_backoff(|| {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(anyhow::anyhow!("nope"))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
