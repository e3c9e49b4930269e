//! Multi-signal document ranking (§4.7): combines BM25 relevance, recency
//! decay, a source-authority prior, and content coverage.

pub mod bm25;

use chrono::{DateTime, Utc};

use crate::extract::date;
use crate::types::{PageExtract, RankedDoc, SearchHit, Signals};
use bm25::Bm25Scorer;

const RELEVANCE_WEIGHT: f64 = 0.5;
const RECENCY_WEIGHT: f64 = 0.2;
const SOURCE_QUALITY_WEIGHT: f64 = 0.2;
const COVERAGE_WEIGHT: f64 = 0.1;
const RECENCY_DECAY_DAYS: f64 = 365.0;
const COVERAGE_WORD_CAP: f64 = 1000.0;

/// One matched `(SearchHit, PageExtract)` pair ready to be scored.
pub struct MatchedDoc<'a> {
    pub hit: &'a SearchHit,
    pub page: &'a PageExtract,
}

/// Ranks a request-local corpus of matched hits. Holds no state across
/// requests — built fresh each time over exactly the docs present.
pub struct Ranker {
    bm25: Bm25Scorer,
}

impl Ranker {
    pub fn new(docs: &[MatchedDoc<'_>]) -> Self {
        let corpus: Vec<String> = docs
            .iter()
            .map(|d| format!("{} {}", d.page.title, d.page.excerpt))
            .collect();
        Self {
            bm25: Bm25Scorer::build(&corpus),
        }
    }

    /// Score every matched doc against `query` and return them sorted by
    /// score descending.
    pub fn rank(&self, query: &str, docs: &[MatchedDoc<'_>]) -> Vec<RankedDoc> {
        let mut ranked: Vec<RankedDoc> = docs
            .iter()
            .enumerate()
            .map(|(i, doc)| self.score_one(query, doc, i))
            .collect();
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }

    fn score_one(&self, query: &str, doc: &MatchedDoc<'_>, index: usize) -> RankedDoc {
        let relevance = self.bm25.score(query, index);
        let recency = recency_signal(doc.page.published_date, doc.hit.published_hint.as_deref());
        let source_quality = source_quality_signal(&doc.hit.domain);
        let coverage = (doc.page.word_count() as f64 / COVERAGE_WORD_CAP).min(1.0);

        let score = RELEVANCE_WEIGHT * relevance
            + RECENCY_WEIGHT * recency
            + SOURCE_QUALITY_WEIGHT * source_quality
            + COVERAGE_WEIGHT * coverage;

        let ranking_reason = ranking_reason(source_quality, recency, relevance);

        RankedDoc {
            id: doc.hit.id.clone(),
            url: doc.hit.url.clone(),
            title: doc.page.title.clone(),
            excerpt: doc.page.excerpt.clone(),
            domain: doc.hit.domain.clone(),
            published_date: doc.page.published_date,
            features: doc.page.features,
            signals: Signals {
                relevance,
                recency,
                source_quality,
                coverage,
            },
            score,
            ranking_reason,
        }
    }
}

fn recency_signal(published_date: Option<DateTime<Utc>>, published_hint: Option<&str>) -> f64 {
    let date = published_date.or_else(|| published_hint.and_then(date::parse_hint));
    let Some(date) = date else {
        return 0.5;
    };

    let now = Utc::now();
    let age_days = (now - date).num_seconds() as f64 / 86_400.0;
    if age_days < 0.0 {
        return 1.0;
    }
    (1.0 - age_days / RECENCY_DECAY_DAYS).clamp(0.0, 1.0)
}

fn source_quality_signal(domain: &str) -> f64 {
    if domain.ends_with(".edu") || domain.ends_with(".gov") {
        0.9
    } else if domain.ends_with(".org") {
        0.7
    } else {
        0.5
    }
}

fn ranking_reason(source_quality: f64, recency: f64, relevance: f64) -> String {
    let mut tags = Vec::new();
    if source_quality > 0.7 {
        tags.push(".edu/.gov domain");
    }
    if recency > 0.7 {
        tags.push("recent");
    }
    if relevance > 0.8 {
        tags.push("highly relevant");
    }
    if tags.is_empty() {
        "matched query".to_string()
    } else {
        tags.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::search::Provenance;

    fn hit(id: &str, domain: &str) -> SearchHit {
        SearchHit {
            id: id.to_string(),
            url: format!("https://{domain}/page"),
            title: "title".to_string(),
            snippet: "snippet".to_string(),
            domain: domain.to_string(),
            published_hint: None,
            provenance: Provenance {
                source_query: "q".to_string(),
                original_rank: 0,
            },
        }
    }

    fn page(title: &str, body: &str, published_date: Option<DateTime<Utc>>) -> PageExtract {
        PageExtract {
            url: "https://example.com".to_string(),
            title: title.to_string(),
            body: body.to_string(),
            excerpt: body.chars().take(200).collect(),
            published_date,
            features: None,
        }
    }

    #[test]
    fn source_quality_maps_domain_tail() {
        assert_eq!(source_quality_signal("school.edu"), 0.9);
        assert_eq!(source_quality_signal("agency.gov"), 0.9);
        assert_eq!(source_quality_signal("nonprofit.org"), 0.7);
        assert_eq!(source_quality_signal("example.com"), 0.5);
    }

    #[test]
    fn recency_unknown_date_is_midpoint() {
        assert_eq!(recency_signal(None, None), 0.5);
    }

    #[test]
    fn recency_future_date_is_one() {
        let future = Utc::now() + chrono::Duration::days(10);
        assert_eq!(recency_signal(Some(future), None), 1.0);
    }

    #[test]
    fn recency_decays_linearly_to_zero_at_one_year() {
        let old = Utc::now() - chrono::Duration::days(365);
        let signal = recency_signal(Some(old), None);
        assert!(signal < 0.05);
    }

    #[test]
    fn rank_sorts_descending_by_score() {
        let h1 = hit("a", "example.com");
        let h2 = hit("b", "school.edu");
        let p1 = page("irrelevant", &"filler text about cooking".repeat(20), None);
        let p2 = page(
            "rust programming",
            &"rust programming language performance systems".repeat(20),
            Some(Utc::now()),
        );
        let docs = vec![MatchedDoc { hit: &h1, page: &p1 }, MatchedDoc { hit: &h2, page: &p2 }];
        let ranker = Ranker::new(&docs);
        let ranked = ranker.rank("rust programming", &docs);
        assert_eq!(ranked[0].id, "b");
        assert!(ranked[0].score >= ranked[1].score);
    }
}
