//! Parallel multi-source search: fan-out, dedup, interleave, authority
//! filter, fallback (§4.3).

mod client;

pub use client::{hash_url, host_of, NoopSearchClient, SearchClient, TavilySearchClient};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::types::search::Provenance;
use crate::types::SearchHit;

pub const DEFAULT_CONCURRENCY: usize = 5;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_MAX_RESULTS: usize = 10;
const MIN_HITS_BEFORE_SUPPLEMENT: usize = 5;
const FINAL_TRUNCATE: usize = 20;
const MAX_SNIPPET_LEN: usize = 500;

/// Lowercase host, strip leading `www.`, strip a trailing `/` (unless the
/// path is bare root), keep the query string, ignore scheme. Two URLs that
/// differ only in those dropped dimensions normalize identically.
pub fn normalize_url(raw: &str) -> String {
    let Ok(parsed) = url::Url::parse(raw) else {
        return raw.trim().to_lowercase();
    };
    let host = parsed
        .host_str()
        .unwrap_or_default()
        .to_lowercase()
        .trim_start_matches("www.")
        .to_string();
    let mut path = parsed.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        path.pop();
    }
    let query = parsed.query().map(|q| format!("?{q}")).unwrap_or_default();
    format!("{host}{path}{query}")
}

fn merge_snippets(existing: &str, incoming: &str) -> String {
    if existing.contains(incoming) {
        return existing.to_string();
    }
    if incoming.contains(existing) {
        return incoming.to_string();
    }
    let merged = format!("{existing} | {incoming}");
    merged.chars().take(MAX_SNIPPET_LEN).collect()
}

/// Fans a [`crate::types::Plan`]'s sub-queries out across a bounded pool of
/// concurrent searches, then dedups, interleaves, authority-filters, and
/// supplements the merged hit list.
pub struct ParallelSearcher {
    client: Arc<dyn SearchClient>,
    concurrency: usize,
    timeout: Duration,
    max_results: usize,
}

impl ParallelSearcher {
    pub fn new(client: Arc<dyn SearchClient>) -> Self {
        Self {
            client,
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    async fn search_one(&self, query: &str) -> anyhow::Result<Vec<SearchHit>> {
        match tokio::time::timeout(self.timeout, self.client.search(query, self.max_results)).await
        {
            Ok(result) => result,
            Err(_) => anyhow::bail!("search timed out for query {query:?}"),
        }
    }

    /// Run the full algorithm of §4.3 over `original_query` and `sub_queries`
    /// (which may be empty).
    pub async fn run(
        &self,
        original_query: &str,
        sub_queries: &[String],
    ) -> anyhow::Result<Vec<SearchHit>> {
        if sub_queries.is_empty() {
            return self.search_one(original_query).await;
        }

        let mut per_query: Vec<(String, Vec<SearchHit>)> = Vec::with_capacity(sub_queries.len());
        for batch in sub_queries.chunks(self.concurrency) {
            let futures = batch.iter().map(|q| {
                let query = q.clone();
                async move {
                    let result = self.search_one(&query).await;
                    (query, result)
                }
            });
            let results = futures::future::join_all(futures).await;
            for (query, result) in results {
                match result {
                    Ok(hits) => per_query.push((query, hits)),
                    Err(e) => {
                        tracing::warn!(sub_query = %query, error = %e, "sub-query search failed");
                    }
                }
            }
        }

        if per_query.is_empty() {
            tracing::warn!("all sub-query searches failed, falling back to original query");
            return self.search_one(original_query).await;
        }

        let merged = dedup_and_merge(per_query.iter().map(|(q, h)| (q.as_str(), h.as_slice())));
        let interleaved = interleave(&merged, per_query.iter().map(|(q, _)| q.as_str()).collect());
        let filtered = authority_filter(interleaved);

        let final_hits = if filtered.len() < MIN_HITS_BEFORE_SUPPLEMENT {
            match self.search_one(original_query).await {
                Ok(supplement) => {
                    let mut all: Vec<(String, Vec<SearchHit>)> = per_query.clone();
                    all.push((original_query.to_string(), supplement));
                    let merged = dedup_and_merge(all.iter().map(|(q, h)| (q.as_str(), h.as_slice())));
                    authority_filter(merged)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "supplemental search failed, continuing with what we have");
                    filtered
                }
            }
        } else {
            filtered
        };

        let mut truncated = final_hits;
        truncated.truncate(FINAL_TRUNCATE);
        Ok(truncated)
    }
}

/// Dedup by normalized URL across all sub-queries, merging snippets and
/// keeping the first-seen provenance (lowest original rank wins ties).
fn dedup_and_merge<'a>(
    per_query: impl Iterator<Item = (&'a str, &'a [SearchHit])>,
) -> Vec<SearchHit> {
    let mut by_norm: HashMap<String, SearchHit> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for (_, hits) in per_query {
        for hit in hits {
            let norm = normalize_url(&hit.url);
            match by_norm.get_mut(&norm) {
                Some(existing) => {
                    existing.snippet = merge_snippets(&existing.snippet, &hit.snippet);
                }
                None => {
                    order.push(norm.clone());
                    by_norm.insert(norm, hit.clone());
                }
            }
        }
    }

    order.into_iter().filter_map(|k| by_norm.remove(&k)).collect()
}

/// Round-robin interleave across sub-queries: first pass takes top 3 from
/// the first two sub-queries and top 2 from each remaining sub-query;
/// subsequent passes take 1 per sub-query.
fn interleave(merged: &[SearchHit], sub_queries: Vec<&str>) -> Vec<SearchHit> {
    let mut by_query: HashMap<&str, Vec<&SearchHit>> = HashMap::new();
    for hit in merged {
        by_query
            .entry(hit.provenance.source_query.as_str())
            .or_default()
            .push(hit);
    }
    for hits in by_query.values_mut() {
        hits.sort_by_key(|h| h.provenance.original_rank);
    }

    let mut cursors: HashMap<&str, usize> = sub_queries.iter().map(|q| (*q, 0)).collect();
    let mut result: Vec<SearchHit> = Vec::with_capacity(merged.len());
    let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();
    let mut first_pass = true;

    loop {
        let mut took_any = false;
        for (i, query) in sub_queries.iter().enumerate() {
            let take = if first_pass {
                if i < 2 {
                    3
                } else {
                    2
                }
            } else {
                1
            };
            let Some(hits) = by_query.get(query) else {
                continue;
            };
            let cursor = cursors.entry(query).or_insert(0);
            let mut taken = 0;
            while taken < take && *cursor < hits.len() {
                let hit = hits[*cursor];
                *cursor += 1;
                let norm = normalize_url(&hit.url);
                if seen.insert(norm) {
                    result.push(hit.clone());
                    took_any = true;
                }
                taken += 1;
            }
        }
        first_pass = false;
        if !took_any {
            break;
        }
    }

    result
}

/// Drop hits whose host is `*.wikipedia.org`/`*.wikimedia.org`, unless doing
/// so would leave fewer than 5 hits.
fn authority_filter(hits: Vec<SearchHit>) -> Vec<SearchHit> {
    let is_authority = |h: &SearchHit| {
        h.domain.ends_with("wikipedia.org") || h.domain.ends_with("wikimedia.org")
    };
    let filtered: Vec<SearchHit> = hits.iter().filter(|h| !is_authority(h)).cloned().collect();
    if filtered.len() < MIN_HITS_BEFORE_SUPPLEMENT {
        hits
    } else {
        filtered
    }
}
