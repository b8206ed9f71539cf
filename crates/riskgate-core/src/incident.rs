//! Fraud incident audit record
//!
//! One incident is created per evaluation and persisted as an
//! append-mostly audit trail: the decision disposition and notes may be
//! updated later (e.g. when a linked payment completes or is disputed),
//! but the scores and per-rule breakdown are never mutated.

use crate::decision::Decision;
use crate::rule::RuleResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Immutable record of one fraud evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudIncident {
    /// Unique incident id (UUID v4)
    pub id: String,

    pub user_id: Option<String>,
    pub email: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,

    /// Action that was gated
    pub action: String,

    /// Amount in minor units
    pub amount_minor: i64,
    pub currency: String,

    /// Per-rule score breakdown (rule name -> result)
    pub rule_results: HashMap<String, RuleResult>,

    /// Derived view: names of rules considered fired; never authoritative
    pub rules_fired: Vec<String>,

    /// Weighted rule combination, before model blending
    pub heuristic_score: f64,

    /// Model probability, when a model was loaded
    pub model_score: Option<f64>,

    /// Blended score the decision was made on
    pub final_score: f64,

    pub decision: Decision,

    /// Free-text disposition notes, updated after the fact
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FraudIncident {
    /// Severity check for alert dispatch
    pub fn is_high_severity(&self, threshold: f64) -> bool {
        self.final_score >= threshold
    }
}
