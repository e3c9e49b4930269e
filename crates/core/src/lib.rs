//! Citation-backed answer engine core: query planning, parallel search,
//! extraction and tagging, ranking, a per-user bandit, and citation-enforced
//! synthesis.
//!
//! This crate has no HTTP surface of its own — `engine-server` wires it onto
//! axum.

pub mod bandit;
pub mod config;
pub mod error;
pub mod events;
pub mod extract;
pub mod llm;
pub mod orchestrator;
pub mod personalize;
pub mod planner;
pub mod rank;
pub mod search;
pub mod synthesize;
pub mod tagger;
pub mod types;

pub use config::Config;
pub use error::{EngineError, Result};
pub use events::EventStore;
pub use orchestrator::{OrchestratorEvent, Pipeline};
