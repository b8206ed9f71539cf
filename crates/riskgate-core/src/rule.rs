//! Rule evaluation results

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Clamp a score to the canonical [0, 1] range
pub fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Result of a single rule evaluation
///
/// Pure data: the score is always in [0, 1], the reason is a short
/// machine-readable tag, and `details` carries evaluator-specific metadata
/// (matched domain, lookup organization, applied tiers, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResult {
    /// Risk score in [0, 1]
    pub score: f64,

    /// Short reason tag (e.g. "country_mismatch", "missing", "no_bin")
    pub reason: String,

    /// Evaluator-specific metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, serde_json::Value>,
}

impl RuleResult {
    /// Create a new rule result; the score is clamped to [0, 1]
    pub fn new(score: f64, reason: impl Into<String>) -> Self {
        Self {
            score: clamp01(score),
            reason: reason.into(),
            details: HashMap::new(),
        }
    }

    /// Attach a metadata detail
    pub fn with_detail(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }
}
