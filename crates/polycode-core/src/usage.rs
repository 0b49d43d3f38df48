//! Context-window usage telemetry.
//!
//! Providers report cumulative token totals, not deltas, so a session's
//! snapshot is always replaced wholesale by the newest report.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::session::SessionId;

/// Token counts for one accounting scope (whole thread or last call).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenBreakdown {
    #[serde(alias = "total_tokens")]
    pub total_tokens: u64,
    #[serde(alias = "input_tokens")]
    pub input_tokens: u64,
    #[serde(alias = "cached_input_tokens")]
    pub cached_input_tokens: u64,
    #[serde(alias = "output_tokens")]
    pub output_tokens: u64,
    #[serde(alias = "reasoning_output_tokens")]
    pub reasoning_output_tokens: u64,
}

impl TokenBreakdown {
    /// Total tokens, falling back to input + output when the provider
    /// leaves the total out.
    pub fn effective_total(&self) -> u64 {
        if self.total_tokens > 0 {
            self.total_tokens
        } else {
            self.input_tokens.saturating_add(self.output_tokens)
        }
    }
}

/// Latest context-window accounting for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextUsageSnapshot {
    pub used_tokens: u64,
    pub max_tokens: Option<u64>,
    pub usage_percent: Option<f64>,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cached_input_tokens: u64,
    pub reasoning_output_tokens: u64,
    pub last_turn_tokens: u64,
    /// Milliseconds since the Unix epoch (UTC).
    pub updated_at: i64,
}

impl ContextUsageSnapshot {
    /// Build a snapshot from a cumulative breakdown, an optional last-call
    /// breakdown (defaults to the cumulative one) and the model's window.
    pub fn from_breakdowns(
        total: &TokenBreakdown,
        last: Option<&TokenBreakdown>,
        max_tokens: Option<u64>,
    ) -> Self {
        let used_tokens = total.effective_total();
        let last = last.unwrap_or(total);
        let max_tokens = max_tokens.filter(|max| *max > 0);

        Self {
            used_tokens,
            max_tokens,
            usage_percent: max_tokens.map(|max| usage_percent(used_tokens, max)),
            input_tokens: total.input_tokens,
            output_tokens: total.output_tokens,
            cached_input_tokens: total.cached_input_tokens,
            reasoning_output_tokens: total.reasoning_output_tokens,
            last_turn_tokens: last.effective_total(),
            updated_at: Utc::now().timestamp_millis(),
        }
    }
}

/// `used / max * 100`, clamped to `[0, 100]`.
pub fn usage_percent(used: u64, max: u64) -> f64 {
    if max == 0 {
        return 0.0;
    }
    (used as f64 / max as f64 * 100.0).clamp(0.0, 100.0)
}

/// Per-session store of the most recent usage snapshot.
#[derive(Debug, Default)]
pub struct ContextUsageTracker {
    snapshots: HashMap<SessionId, ContextUsageSnapshot>,
}

impl ContextUsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the session's snapshot.
    pub fn record(&mut self, session_id: &SessionId, snapshot: ContextUsageSnapshot) {
        self.snapshots.insert(session_id.clone(), snapshot);
    }

    pub fn get(&self, session_id: &SessionId) -> Option<&ContextUsageSnapshot> {
        self.snapshots.get(session_id)
    }

    pub fn clear(&mut self, session_id: &SessionId) -> Option<ContextUsageSnapshot> {
        self.snapshots.remove(session_id)
    }
}
