//! Citation-enforced answer synthesis: prompt construction, streaming, and
//! post-generation citation validation/auto-correction (§4.10).

use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tokio::sync::mpsc;

use crate::llm::{CallOptions, LlmClient};
use crate::types::{AnswerPacket, Citation, RankedDoc};

const TEMPERATURE: f64 = 0.3;
const MAX_TOKENS: u32 = 1024;
const PASSAGE_LEN: usize = 200;

const SYSTEM_PROMPT: &str = "You answer the user's question using only the numbered sources \
    below. Rules:\n\
    1. Put an inline citation like [N] immediately after every factual claim, where N is the \
    source number it came from.\n\
    2. Cite diverse sources rather than leaning on one.\n\
    3. Write 2 to 5 paragraphs.\n\
    4. If sources disagree, say so explicitly.\n\
    5. If the sources don't fully cover the question, say what's missing.";

lazy_static! {
    static ref CITATION_PATTERN: Regex = Regex::new(r"\[(\d+(?:\s*,\s*\d+)*)\]").unwrap();
}

/// Builds the synthesis prompt, streams the completion through `on_chunk`,
/// and validates citations against `sources` once the full text has
/// accumulated.
pub struct Synthesizer {
    llm: Arc<dyn LlmClient>,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn synthesize(
        &self,
        query: &str,
        query_id: &str,
        sources: &[RankedDoc],
        on_chunk: mpsc::UnboundedSender<String>,
    ) -> anyhow::Result<AnswerPacket> {
        let user_prompt = build_user_prompt(query, sources);
        let opts = CallOptions {
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            system_prompt: SYSTEM_PROMPT.to_string(),
        };

        let raw_text = self.llm.stream_completion(&user_prompt, opts, on_chunk).await?;
        let (text, citations) = validate_citations(&raw_text, sources);

        Ok(AnswerPacket {
            query_id: query_id.to_string(),
            text,
            citations,
            sources: sources.to_vec(),
        })
    }
}

fn build_user_prompt(query: &str, sources: &[RankedDoc]) -> String {
    let mut listing = String::new();
    for (i, source) in sources.iter().enumerate() {
        listing.push_str(&format!(
            "[{}] {} ({})\n{}\n\n",
            i + 1,
            source.title,
            source.domain,
            source.excerpt
        ));
    }
    format!("Question: {query}\n\nSources:\n{listing}")
}

/// Extracts every `[n]`/`[n, m, ...]` citation group, resolves in-range
/// indices to [`Citation`]s, and strips the brackets (leaving the bare
/// number) from any group containing an out-of-range index — the
/// documented strip-only behavior (never remaps; see DESIGN.md).
fn validate_citations(text: &str, sources: &[RankedDoc]) -> (String, Vec<Citation>) {
    let mut citations: Vec<Citation> = Vec::new();
    let mut seen_indices: HashMap<usize, usize> = HashMap::new();
    let mut result = String::with_capacity(text.len());
    let mut last_end = 0;

    for m in CITATION_PATTERN.find_iter(text) {
        result.push_str(&text[last_end..m.start()]);
        last_end = m.end();

        let captures = CITATION_PATTERN.captures(&text[m.start()..m.end()]).unwrap();
        let numbers: Vec<i64> = captures[1]
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();

        let all_valid = numbers.iter().all(|&n| n >= 1 && (n as usize) <= sources.len());

        if all_valid {
            result.push_str(&text[m.start()..m.end()]);
            for &n in &numbers {
                let index = n as usize;
                if let std::collections::hash_map::Entry::Vacant(e) = seen_indices.entry(index) {
                    e.insert(citations.len());
                    let source = &sources[index - 1];
                    citations.push(Citation {
                        index,
                        source_id: source.id.clone(),
                        passage: source.excerpt.chars().take(PASSAGE_LEN).collect(),
                    });
                }
            }
        } else {
            tracing::debug!(group = %&text[m.start()..m.end()], "stripping out-of-range citation");
            let bare: Vec<String> = numbers.iter().map(|n| n.to_string()).collect();
            result.push_str(&bare.join(", "));
        }
    }
    result.push_str(&text[last_end..]);

    (result, citations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Signals;

    fn source(id: &str) -> RankedDoc {
        RankedDoc {
            id: id.to_string(),
            url: format!("https://example.com/{id}"),
            title: "title".to_string(),
            excerpt: "excerpt text".to_string(),
            domain: "example.com".to_string(),
            published_date: None,
            features: None,
            signals: Signals {
                relevance: 0.5,
                recency: 0.5,
                source_quality: 0.5,
                coverage: 0.5,
            },
            score: 0.5,
            ranking_reason: "matched query".to_string(),
        }
    }

    #[test]
    fn in_range_citations_round_trip() {
        let sources: Vec<RankedDoc> = (0..5).map(|i| source(&format!("s{i}"))).collect();
        let text = "Photosynthesis converts light to energy [1]. Plants use chlorophyll [2].";
        let (processed, citations) = validate_citations(text, &sources);
        assert_eq!(processed, text);
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].index, 1);
        assert_eq!(citations[0].source_id, "s0");
        assert_eq!(citations[1].index, 2);
    }

    #[test]
    fn out_of_range_citation_is_stripped_not_recorded() {
        let sources: Vec<RankedDoc> = (0..5).map(|i| source(&format!("s{i}"))).collect();
        let text = "Some fact that cites a source that does not exist [99].";
        let (processed, citations) = validate_citations(text, &sources);
        assert!(processed.contains("99"));
        assert!(!processed.contains("[99]"));
        assert!(citations.is_empty());
    }

    #[test]
    fn duplicate_citation_indices_are_deduped() {
        let sources: Vec<RankedDoc> = (0..3).map(|i| source(&format!("s{i}"))).collect();
        let text = "First claim [1]. Second claim also cites [1].";
        let (_, citations) = validate_citations(text, &sources);
        assert_eq!(citations.len(), 1);
    }

    #[test]
    fn multi_index_group_all_valid_is_kept() {
        let sources: Vec<RankedDoc> = (0..3).map(|i| source(&format!("s{i}"))).collect();
        let text = "Corroborated by multiple sources [1, 2].";
        let (processed, citations) = validate_citations(text, &sources);
        assert!(processed.contains("[1, 2]"));
        assert_eq!(citations.len(), 2);
    }
}
