//! Decision values produced by the threshold policy

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete decision for one evaluation.
///
/// `Challenge` is a reserved value carried over from the persisted record
/// vocabulary; no policy path currently produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Let the action proceed
    Allow,
    /// Reserved: step-up verification (never produced by the policy)
    Challenge,
    /// Queue the action for manual review
    ManualReview,
    /// Block the action
    Deny,
}

impl Decision {
    /// Stable string form, matching the persisted record vocabulary
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Challenge => "challenge",
            Decision::ManualReview => "manual_review",
            Decision::Deny => "deny",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
