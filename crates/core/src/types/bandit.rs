//! Bandit state types.

use serde::{Deserialize, Serialize};

/// Real-valued Beta statistics for one arm. `successes + failures` never
/// decreases.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ArmStats {
    pub successes: f64,
    pub failures: f64,
}

impl ArmStats {
    /// The Beta(α = successes+1, β = failures+1) mean — the deterministic
    /// point estimate used in place of a random draw.
    pub fn mean(&self) -> f64 {
        (self.successes + 1.0) / (self.successes + self.failures + 2.0)
    }
}

/// An impression that has not yet resolved to a click (success) or a
/// timeout (failure).
#[derive(Debug, Clone)]
pub struct PendingImpression {
    pub arms: Vec<String>,
    pub query_id: String,
    pub source_id: String,
    pub timestamp_ms: i64,
}
