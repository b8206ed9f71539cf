//! Threshold decision policy

use crate::error::{EngineError, Result};
use riskgate_core::Decision;

/// Maps a final score to a decision via two ascending thresholds.
///
/// Pure, stateless, and total: below the flag threshold allows, at or
/// above the deny threshold denies, and everything between goes to
/// manual review. `Decision::Challenge` is never produced here.
#[derive(Debug, Clone, Copy)]
pub struct DecisionPolicy {
    flag_threshold: f64,
    deny_threshold: f64,
}

impl DecisionPolicy {
    pub fn new(flag_threshold: f64, deny_threshold: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&flag_threshold) || !(0.0..=1.0).contains(&deny_threshold) {
            return Err(EngineError::InvalidConfig(
                "decision thresholds must be in [0, 1]".to_string(),
            ));
        }
        if flag_threshold >= deny_threshold {
            return Err(EngineError::InvalidConfig(format!(
                "flag threshold ({}) must be below deny threshold ({})",
                flag_threshold, deny_threshold
            )));
        }
        Ok(Self {
            flag_threshold,
            deny_threshold,
        })
    }

    pub fn decide(&self, score: f64) -> Decision {
        if score >= self.deny_threshold {
            Decision::Deny
        } else if score >= self.flag_threshold {
            Decision::ManualReview
        } else {
            Decision::Allow
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> DecisionPolicy {
        DecisionPolicy::new(0.6, 0.85).unwrap()
    }

    #[test]
    fn test_below_flag_allows() {
        assert_eq!(policy().decide(0.0), Decision::Allow);
        assert_eq!(policy().decide(0.59999), Decision::Allow);
    }

    #[test]
    fn test_exact_flag_threshold_reviews() {
        assert_eq!(policy().decide(0.6), Decision::ManualReview);
    }

    #[test]
    fn test_between_thresholds_reviews() {
        assert_eq!(policy().decide(0.7), Decision::ManualReview);
        assert_eq!(policy().decide(0.84999), Decision::ManualReview);
    }

    #[test]
    fn test_exact_deny_threshold_denies() {
        assert_eq!(policy().decide(0.85), Decision::Deny);
        assert_eq!(policy().decide(1.0), Decision::Deny);
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        assert!(DecisionPolicy::new(0.9, 0.5).is_err());
        assert!(DecisionPolicy::new(0.5, 0.5).is_err());
        assert!(DecisionPolicy::new(-0.1, 0.5).is_err());
        assert!(DecisionPolicy::new(0.5, 1.1).is_err());
    }
}
