//! Synthesized answer and citation types.

use serde::{Deserialize, Serialize};

use super::ranking::RankedDoc;

/// One resolved citation: `text` contained `[index]`, which resolved to
/// `sourceId` with grounding `passage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub index: usize,
    pub source_id: String,
    pub passage: String,
}

/// The final response of one `/api/answer` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerPacket {
    pub query_id: String,
    pub text: String,
    pub citations: Vec<Citation>,
    pub sources: Vec<RankedDoc>,
}
