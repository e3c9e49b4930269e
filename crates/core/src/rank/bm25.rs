//! Okapi BM25 scorer over a request-local corpus (§4.6).

use std::collections::HashMap;

const K1: f64 = 1.5;
const B: f64 = 0.75;
/// Tokens of length ≤ 2 are dropped.
const MIN_TOKEN_LEN: usize = 2;
const SCORE_DIVISOR: f64 = 10.0;

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .filter(|t| t.len() > MIN_TOKEN_LEN)
        .map(|t| t.to_string())
        .collect()
}

struct Document {
    term_counts: HashMap<String, usize>,
    len: usize,
}

/// Built once per request over `title + " " + excerpt` for every
/// successfully extracted page. Scores divided by 10 and clamped to
/// `[0, 1]`.
pub struct Bm25Scorer {
    documents: Vec<Document>,
    doc_freq: HashMap<String, usize>,
    avg_doc_len: f64,
}

impl Bm25Scorer {
    pub fn build(corpus: &[String]) -> Self {
        let mut documents = Vec::with_capacity(corpus.len());
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for text in corpus {
            let tokens = tokenize(text);
            let mut term_counts: HashMap<String, usize> = HashMap::new();
            for token in &tokens {
                *term_counts.entry(token.clone()).or_insert(0) += 1;
            }
            for term in term_counts.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            documents.push(Document {
                len: tokens.len(),
                term_counts,
            });
        }

        let avg_doc_len = if documents.is_empty() {
            0.0
        } else {
            documents.iter().map(|d| d.len as f64).sum::<f64>() / documents.len() as f64
        };

        Self {
            documents,
            doc_freq,
            avg_doc_len,
        }
    }

    fn idf(&self, term: &str) -> f64 {
        let n = self.documents.len() as f64;
        let df = *self.doc_freq.get(term).unwrap_or(&0) as f64;
        (((n - df + 0.5) / (df + 0.5)) + 1.0).ln().max(0.0)
    }

    /// BM25 score of `query` against the document at `doc_index`, clamped
    /// to `[0, 1]` after dividing by 10.
    pub fn score(&self, query: &str, doc_index: usize) -> f64 {
        let Some(doc) = self.documents.get(doc_index) else {
            return 0.0;
        };
        if self.avg_doc_len == 0.0 {
            return 0.0;
        }

        let query_terms = tokenize(query);
        let mut raw = 0.0;
        for term in &query_terms {
            let Some(&freq) = doc.term_counts.get(term) else {
                continue;
            };
            let freq = freq as f64;
            let idf = self.idf(term);
            let numerator = freq * (K1 + 1.0);
            let denominator = freq + K1 * (1.0 - B + B * (doc.len as f64 / self.avg_doc_len));
            raw += idf * (numerator / denominator);
        }

        (raw / SCORE_DIVISOR).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_are_clamped_to_unit_interval() {
        let corpus = vec![
            "rust programming language systems".to_string(),
            "python scripting language".to_string(),
            "cooking recipes and food".to_string(),
        ];
        let scorer = Bm25Scorer::build(&corpus);
        for i in 0..corpus.len() {
            let score = scorer.score("rust programming", i);
            assert!((0.0..=1.0).contains(&score));
        }
    }

    #[test]
    fn relevant_document_scores_higher_than_irrelevant() {
        let corpus = vec![
            "rust programming language systems performance".to_string(),
            "cooking recipes and food preparation".to_string(),
        ];
        let scorer = Bm25Scorer::build(&corpus);
        let relevant = scorer.score("rust programming", 0);
        let irrelevant = scorer.score("rust programming", 1);
        assert!(relevant > irrelevant);
    }

    #[test]
    fn empty_corpus_scores_zero() {
        let scorer = Bm25Scorer::build(&[]);
        assert_eq!(scorer.score("anything", 0), 0.0);
    }

    #[test]
    fn short_tokens_are_dropped() {
        let tokens = tokenize("a an to rust is fun");
        assert_eq!(tokens, vec!["rust".to_string(), "fun".to_string()]);
    }
}
