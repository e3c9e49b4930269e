//! Process-wide configuration, loaded once at startup (§6.3).
//!
//! Mirrors `Config::from_env()` (`server/src/config.rs`): `dotenvy` for
//! local `.env` files, `std::env` + `anyhow::Context` for everything else.

use anyhow::Context;
use dotenvy::dotenv;
use std::env;

const DEFAULT_LISTEN_PORT: u16 = 3001;
const DEFAULT_WEB_ORIGIN: &str = "http://localhost:5173";

/// Recognized environment keys (§6.3). `search_api_key`/`llm_api_key` are
/// absent rather than erroring when unset — the server wires a stub
/// (`NoopSearchClient`) in that case rather than refusing to start, so
/// local development and tests don't need real credentials.
#[derive(Debug, Clone)]
pub struct Config {
    pub search_api_key: Option<String>,
    pub llm_api_key: Option<String>,
    pub listen_port: u16,
    pub web_origin: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenv();

        Ok(Self {
            search_api_key: env::var("SEARCH_API_KEY").ok(),
            llm_api_key: env::var("LLM_API_KEY").ok(),
            listen_port: env::var("LISTEN_PORT")
                .unwrap_or_else(|_| DEFAULT_LISTEN_PORT.to_string())
                .parse()
                .context("LISTEN_PORT must be a valid port number")?,
            web_origin: env::var("WEB_ORIGIN").unwrap_or_else(|_| DEFAULT_WEB_ORIGIN.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_env_unset() {
        // SAFETY: this test runs single-threaded w.r.t. these keys and
        // clears them first; no other test in this crate reads them.
        unsafe {
            for key in ["SEARCH_API_KEY", "LLM_API_KEY", "LISTEN_PORT", "WEB_ORIGIN"] {
                env::remove_var(key);
            }
        }
        let config = Config::from_env().unwrap();
        assert_eq!(config.listen_port, DEFAULT_LISTEN_PORT);
        assert_eq!(config.web_origin, DEFAULT_WEB_ORIGIN);
        assert!(config.search_api_key.is_none());
        assert!(config.llm_api_key.is_none());
    }
}
