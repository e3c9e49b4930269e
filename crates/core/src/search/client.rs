//! Search provider seam (§4.2).
//!
//! Mirrors the `BaseSearchService`/`TavilyClient` split
//! (`kernel/tavily_client.rs`): a thin trait the parallel searcher drives,
//! plus one real backend and one no-op stub for tests and offline startup.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::types::SearchHit;
use crate::types::search::Provenance;

/// One search over one sub-query. Implementations normalize results into
/// [`SearchHit`] but do not dedup, interleave, or filter — that's the
/// [`crate::search::ParallelSearcher`]'s job.
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<SearchHit>>;
}

/// Stable short hex id for a URL. Callers pass the *normalized* URL so
/// scheme/`www.`/trailing-slash variance collapses to one id.
pub fn hash_url(normalized_url: &str) -> String {
    let digest = Sha256::digest(normalized_url.as_bytes());
    hex::encode(&digest[..8])
}

/// Extract the registrable-ish host from a URL string for display/filtering
/// purposes (`example.com`, not `www.example.com`).
pub fn host_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_default()
}

/// Tavily-backed search client, grounded on `TavilyClient`.
pub struct TavilySearchClient {
    api_key: String,
    http: reqwest::Client,
}

impl TavilySearchClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            http: reqwest::Client::new(),
        }
    }
}

#[derive(serde::Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    search_depth: &'a str,
    max_results: usize,
}

#[derive(serde::Deserialize)]
struct TavilyResponse {
    results: Vec<TavilyResult>,
}

#[derive(serde::Deserialize)]
struct TavilyResult {
    url: String,
    title: Option<String>,
    content: Option<String>,
    published_date: Option<String>,
}

#[async_trait]
impl SearchClient for TavilySearchClient {
    async fn search(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<SearchHit>> {
        let body = TavilyRequest {
            query,
            search_depth: "basic",
            max_results,
        };

        let response = self
            .http
            .post("https://api.tavily.com/search")
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("Tavily API error: {}", response.status());
        }

        let parsed: TavilyResponse = response.json().await?;

        let hits = parsed
            .results
            .into_iter()
            .enumerate()
            .map(|(rank, r)| {
                let normalized = super::normalize_url(&r.url);
                SearchHit {
                    id: hash_url(&normalized),
                    domain: host_of(&r.url),
                    title: r.title.unwrap_or_default(),
                    snippet: r.content.unwrap_or_default(),
                    published_hint: r.published_date,
                    url: r.url,
                    provenance: Provenance {
                        source_query: query.to_string(),
                        original_rank: rank,
                    },
                }
            })
            .collect();

        Ok(hits)
    }
}

/// Always-empty search client. Lets the server start up without a search
/// API key wired (mirrors `NoopSearchService`).
pub struct NoopSearchClient;

#[async_trait]
impl SearchClient for NoopSearchClient {
    async fn search(&self, _query: &str, _max_results: usize) -> anyhow::Result<Vec<SearchHit>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_url_is_stable() {
        let a = hash_url("example.com/page");
        let b = hash_url("example.com/page");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[tokio::test]
    async fn noop_client_returns_empty() {
        let hits = NoopSearchClient.search("anything", 10).await.unwrap();
        assert!(hits.is_empty());
    }
}
