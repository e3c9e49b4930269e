//! Page extraction types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::features::ContentFeatures;

/// Clean content derived from a fetched page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageExtract {
    pub url: String,
    pub title: String,
    pub body: String,
    pub excerpt: String,
    pub published_date: Option<DateTime<Utc>>,
    pub features: Option<ContentFeatures>,
}

impl PageExtract {
    /// Word count of `body`, used by the ranker's coverage signal.
    pub fn word_count(&self) -> usize {
        self.body.split_whitespace().count()
    }
}
