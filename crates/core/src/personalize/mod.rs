//! Joins ranked docs with bandit scores and applies a capped multiplicative
//! boost (§4.9 — "Personalizer" in the component table).

use std::collections::HashMap;

use crate::bandit::Bandit;
use crate::types::RankedDoc;

const BOOST_WEIGHT: f64 = 0.3;
const MAX_MULTIPLIER: f64 = 1.3;
const PERSONALIZATION_NOTE_THRESHOLD: f64 = 0.05;

pub struct Personalizer<'a> {
    bandit: &'a Bandit,
}

impl<'a> Personalizer<'a> {
    pub fn new(bandit: &'a Bandit) -> Self {
        Self { bandit }
    }

    /// Apply the bandit's current scores as a capped boost to `docs`, then
    /// stably re-sort by the new score. Identity when the bandit has no
    /// tracked arms for this user.
    pub async fn personalize(&self, user_id: &str, mut docs: Vec<RankedDoc>) -> Vec<RankedDoc> {
        let scores = self.bandit.scores(user_id).await;
        if scores.is_empty() {
            return docs;
        }

        for doc in docs.iter_mut() {
            apply_boost(doc, &scores);
        }

        docs.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        docs
    }
}

fn apply_boost(doc: &mut RankedDoc, scores: &HashMap<String, f64>) {
    let Some(features) = doc.features else { return };
    let arms = features.arms();

    let matched: Vec<(String, f64)> = arms
        .iter()
        .filter_map(|arm| scores.get(arm).map(|s| (arm.clone(), *s)))
        .collect();
    if matched.is_empty() {
        return;
    }

    let boost = matched.iter().map(|(_, s)| s).sum::<f64>() / matched.len() as f64;
    let multiplier = (1.0 + BOOST_WEIGHT * boost).min(MAX_MULTIPLIER);
    doc.score *= multiplier;

    if boost > PERSONALIZATION_NOTE_THRESHOLD {
        let mut top_matched = matched;
        top_matched.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        let values: Vec<String> = top_matched
            .iter()
            .take(2)
            .map(|(arm, _)| arm.split_once(':').map(|(_, v)| v.to_string()).unwrap_or_default())
            .collect();
        doc.ranking_reason = format!("{} + personalized ({})", doc.ranking_reason, values.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentFeatures, Signals};

    fn doc(id: &str, score: f64, features: Option<ContentFeatures>) -> RankedDoc {
        RankedDoc {
            id: id.to_string(),
            url: format!("https://example.com/{id}"),
            title: "title".to_string(),
            excerpt: "excerpt".to_string(),
            domain: "example.com".to_string(),
            published_date: None,
            features,
            signals: Signals {
                relevance: 0.5,
                recency: 0.5,
                source_quality: 0.5,
                coverage: 0.5,
            },
            score,
            ranking_reason: "matched query".to_string(),
        }
    }

    #[tokio::test]
    async fn identity_when_bandit_empty() {
        let bandit = Bandit::new();
        let docs = vec![doc("a", 0.9, Some(ContentFeatures::neutral())), doc("b", 0.5, None)];
        let personalizer = Personalizer::new(&bandit);
        let result = personalizer.personalize("u1", docs.clone()).await;
        assert_eq!(result.len(), docs.len());
        assert_eq!(result[0].score, docs[0].score);
        assert_eq!(result[0].id, docs[0].id);
    }

    #[tokio::test]
    async fn boost_never_exceeds_cap() {
        let bandit = Bandit::new();
        for _ in 0..50 {
            bandit.record_click("u1", &ContentFeatures::neutral().arms().to_vec(), None).await;
        }
        let docs = vec![doc("a", 1.0, Some(ContentFeatures::neutral()))];
        let personalizer = Personalizer::new(&bandit);
        let result = personalizer.personalize("u1", docs).await;
        assert!(result[0].score <= 1.0 * MAX_MULTIPLIER + 1e-9);
    }

    #[tokio::test]
    async fn docs_without_features_are_unaffected() {
        let bandit = Bandit::new();
        bandit.record_click("u1", &ContentFeatures::neutral().arms().to_vec(), None).await;
        let docs = vec![doc("a", 0.5, None)];
        let personalizer = Personalizer::new(&bandit);
        let result = personalizer.personalize("u1", docs.clone()).await;
        assert_eq!(result[0].score, docs[0].score);
    }
}
