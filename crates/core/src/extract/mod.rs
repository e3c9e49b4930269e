//! Page extraction: fetch, strip chrome, recover a published date (§4.4).
//!
//! Built on the `SimpleScraper` pattern (`kernel/simple_scraper.rs`): a
//! browser-UA `reqwest::Client`, `scraper` for DOM queries, `htmd` for
//! markdown conversion, and a `Semaphore` to bound fetch concurrency.

pub mod date;

use std::sync::Arc;
use std::time::Duration;

use scraper::{Html, Selector};
use tokio::sync::Semaphore;

use crate::tagger::FeatureTagger;
use crate::types::PageExtract;

const FETCH_TIMEOUT: Duration = Duration::from_secs(8);
const DEFAULT_CONCURRENCY: usize = 8;
const EXCERPT_LEN: usize = 280;

const MAIN_CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role='main']",
    "#content",
    "#main",
    ".content",
    ".post-content",
    ".entry-content",
];

const BOILERPLATE_SELECTORS: &[&str] = &[
    "nav", "header", "footer", "aside", "script", "style", "noscript", "iframe",
    ".nav", ".navbar", ".header", ".footer", ".sidebar", ".menu", ".advertisement", ".ads",
];

/// Fetches and cleans one URL. `None` on any failure — the caller filters
/// nulls and continues with whatever succeeded (§7).
pub struct PageExtractor {
    http: reqwest::Client,
}

impl Default for PageExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl PageExtractor {
    pub fn new() -> Self {
        let user_agent = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .expect("static TLS/client config is valid");
        Self { http }
    }

    /// Fetch and extract one page. `published_hint` is the search backend's
    /// unparsed age string, used only if the page's own meta tags don't
    /// yield a date.
    pub async fn extract(&self, url: &str, published_hint: Option<&str>) -> Option<PageExtract> {
        match self.try_extract(url, published_hint).await {
            Ok(extract) => Some(extract),
            Err(e) => {
                tracing::debug!(url, error = %e, "page extraction failed");
                None
            }
        }
    }

    async fn try_extract(
        &self,
        url: &str,
        published_hint: Option<&str>,
    ) -> anyhow::Result<PageExtract> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("HTTP {} for {url}", response.status());
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.contains("html") && !content_type.is_empty() {
            anyhow::bail!("non-HTML content-type {content_type} for {url}");
        }

        let html = response.text().await?;
        let document = Html::parse_document(&html);

        let title = extract_title(&document).unwrap_or_else(|| url.to_string());
        let main_html = extract_main_content(&document);
        let body = htmd::convert(&main_html)
            .unwrap_or_else(|_| document.root_element().text().collect::<String>());
        let body = body.trim().to_string();

        if body.len() < 20 {
            anyhow::bail!("page has no meaningful content: {url}");
        }

        let excerpt: String = body.chars().take(EXCERPT_LEN).collect();
        let published_date = date::extract_meta_date(&document)
            .or_else(|| published_hint.and_then(date::parse_hint));

        Ok(PageExtract {
            url: url.to_string(),
            title,
            body,
            excerpt,
            published_date,
            features: None,
        })
    }
}

fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

fn extract_main_content(document: &Html) -> String {
    for selector_str in MAIN_CONTENT_SELECTORS {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(el) = document.select(&selector).next() {
                return el.html();
            }
        }
    }
    if let Ok(body_selector) = Selector::parse("body") {
        if let Some(body) = document.select(&body_selector).next() {
            return remove_boilerplate(&body.html());
        }
    }
    document.html()
}

fn remove_boilerplate(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut result = html.to_string();
    for selector_str in BOILERPLATE_SELECTORS {
        if let Ok(selector) = Selector::parse(selector_str) {
            for element in document.select(&selector) {
                result = result.replace(&element.html(), "");
            }
        }
    }
    result
}

/// Run fetch + feature tagging over every `(url, hint)` pair as one
/// concurrent task per URL, bounded by a semaphore, and return only the
/// successes — mirrors the `crawl()` level-fan-out pattern. Tagging runs
/// inside the same per-URL task as extraction (not as a second sequential
/// pass) so a slow or backed-off tag call on one page never blocks the
/// rest of the corpus.
pub async fn extract_all(
    extractor: Arc<PageExtractor>,
    tagger: FeatureTagger,
    targets: Vec<(String, Option<String>)>,
) -> Vec<PageExtract> {
    let semaphore = Arc::new(Semaphore::new(DEFAULT_CONCURRENCY));
    let handles: Vec<_> = targets
        .into_iter()
        .map(|(url, hint)| {
            let extractor = extractor.clone();
            let tagger = tagger.clone();
            let semaphore = semaphore.clone();
            tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                let mut extract = extractor.extract(&url, hint.as_deref()).await?;
                extract.features = Some(tagger.tag(&extract.title, &extract.body).await);
                Some(extract)
            })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        if let Ok(Some(extract)) = handle.await {
            results.push(extract);
        }
    }
    results
}
