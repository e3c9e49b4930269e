//! Per-user Thompson-sampling bandit over content-feature arms (§4.8).
//!
//! Per-user state is keyed the way `StreamHub` (`kernel/stream_hub.rs`)
//! keys per-topic broadcast channels: an outer
//! `RwLock<HashMap<UserId, _>>` for lookup/creation, with a `Mutex` around
//! each user's state so `recordPendingImpression`/`recordClick`/
//! `resolvePendingImpressions`/`scores` are mutually exclusive per-user
//! without contending across users.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::types::{ArmStats, PendingImpression};

/// Default pending-impression timeout, in milliseconds.
pub const DEFAULT_PENDING_TIMEOUT_MS: i64 = 25_000;

#[derive(Default)]
struct UserBanditState {
    arms: HashMap<String, ArmStats>,
    pending: Vec<PendingImpression>,
}

/// Registry of per-user bandit state. Cheaply cloneable; all clones share
/// the same underlying maps.
#[derive(Clone)]
pub struct Bandit {
    users: Arc<RwLock<HashMap<String, Arc<Mutex<UserBanditState>>>>>,
    pending_timeout_ms: i64,
}

impl Default for Bandit {
    fn default() -> Self {
        Self::new()
    }
}

impl Bandit {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            pending_timeout_ms: DEFAULT_PENDING_TIMEOUT_MS,
        }
    }

    pub fn with_pending_timeout_ms(pending_timeout_ms: i64) -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            pending_timeout_ms,
        }
    }

    async fn user_state(&self, user_id: &str) -> Arc<Mutex<UserBanditState>> {
        if let Some(state) = self.users.read().await.get(user_id) {
            return state.clone();
        }
        let mut users = self.users.write().await;
        users
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(UserBanditState::default())))
            .clone()
    }

    /// Append a pending impression. Does not mutate arm stats.
    pub async fn record_pending_impression(
        &self,
        user_id: &str,
        arms: Vec<String>,
        query_id: String,
        source_id: String,
        now_ms: i64,
    ) {
        let state = self.user_state(user_id).await;
        let mut state = state.lock().await;
        state.pending.push(PendingImpression {
            arms,
            query_id,
            source_id,
            timestamp_ms: now_ms,
        });
    }

    /// For each arm, `successes += 1/|arms|`. Removes the matching pending
    /// entry by `source_id` if given, else the first entry whose arm set
    /// equals `arms` exactly (order-insensitive).
    pub async fn record_click(&self, user_id: &str, arms: &[String], source_id: Option<&str>) {
        if arms.is_empty() {
            return;
        }
        let credit = 1.0 / arms.len() as f64;
        let state = self.user_state(user_id).await;
        let mut state = state.lock().await;

        for arm in arms {
            state.arms.entry(arm.clone()).or_default().successes += credit;
        }

        let remove_at = if let Some(source_id) = source_id {
            state.pending.iter().position(|p| p.source_id == source_id)
        } else {
            let mut wanted: Vec<&str> = arms.iter().map(|s| s.as_str()).collect();
            wanted.sort_unstable();
            state.pending.iter().position(|p| {
                let mut got: Vec<&str> = p.arms.iter().map(|s| s.as_str()).collect();
                got.sort_unstable();
                got == wanted
            })
        };
        if let Some(index) = remove_at {
            state.pending.remove(index);
        }
    }

    /// Remove pending entries older than the configured timeout, crediting
    /// `failures += 1/|arms|` for each of their arms.
    pub async fn resolve_pending_impressions(&self, user_id: &str, now_ms: i64) {
        let state = self.user_state(user_id).await;
        let mut state = state.lock().await;
        let timeout_ms = self.pending_timeout_ms;

        let (expired, remaining): (Vec<_>, Vec<_>) = state
            .pending
            .drain(..)
            .partition(|p| now_ms - p.timestamp_ms > timeout_ms);
        state.pending = remaining;

        for impression in expired {
            let credit = 1.0 / impression.arms.len() as f64;
            for arm in &impression.arms {
                state.arms.entry(arm.clone()).or_default().failures += credit;
            }
        }
    }

    /// Beta-mean score for every tracked arm. Untracked arms are absent.
    pub async fn scores(&self, user_id: &str) -> HashMap<String, f64> {
        let state = self.user_state(user_id).await;
        let state = state.lock().await;
        state
            .arms
            .iter()
            .map(|(arm, stats)| (arm.clone(), stats.mean()))
            .collect()
    }

    /// Top `k` arms by score, descending.
    pub async fn top_k(&self, user_id: &str, k: usize) -> Vec<(String, f64)> {
        let mut scores: Vec<(String, f64)> = self.scores(user_id).await.into_iter().collect();
        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scores.truncate(k);
        scores
    }

    /// Total interactions recorded for a user (sum of successes + failures
    /// across all arms) — used by `/api/preferences`.
    pub async fn total_interactions(&self, user_id: &str) -> f64 {
        let state = self.user_state(user_id).await;
        let state = state.lock().await;
        state.arms.values().map(|s| s.successes + s.failures).sum()
    }

    /// Total deletion of a user's bandit state.
    pub async fn reset(&self, user_id: &str) {
        self.users.write().await.remove(user_id);
    }
}
