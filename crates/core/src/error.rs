//! Typed errors for the answer engine core.
//!
//! Uses `thiserror` for library errors so the orchestrator can pattern-match
//! on failure kind instead of inspecting string messages.

use thiserror::Error;

/// Errors that can arise from a single pipeline component.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A transient upstream failure (LLM/search 5xx, timeout, network) that
    /// survived retry-with-backoff.
    #[error("transient upstream failure: {0}")]
    Transient(#[source] anyhow::Error),

    /// Query planning failed even before the fallback plan could be built.
    /// This should never escape the planner — see `planner::plan`.
    #[error("planner failed: {0}")]
    Planner(#[source] anyhow::Error),

    /// Every sub-query search failed, and the single fallback search also
    /// failed. Request-fatal per §7.
    #[error("search exhausted: all sub-queries and fallback failed")]
    SearchExhausted,

    /// Synthesis could not produce any answer text. Request-fatal per §7.
    #[error("synthesis failed: {0}")]
    SynthesisFailed(#[source] anyhow::Error),

    /// A JSON schema/parse failure from the LLM, retried to exhaustion.
    #[error("LLM schema validation failed after retries: {0}")]
    SchemaValidation(#[source] anyhow::Error),
}

impl EngineError {
    /// Stable machine-readable variant name, used as the `error` field of
    /// the SSE `error` frame (§6.1).
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Transient(_) => "Transient",
            EngineError::Planner(_) => "Planner",
            EngineError::SearchExhausted => "SearchExhausted",
            EngineError::SynthesisFailed(_) => "SynthesisFailed",
            EngineError::SchemaValidation(_) => "SchemaValidation",
        }
    }
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
