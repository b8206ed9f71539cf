//! Score aggregation
//!
//! The heuristic score is a weighted linear combination of the rule and
//! velocity signals. The weight table is policy configuration: changing
//! it is a deliberate act, and the sum-to-one invariant is validated at
//! construction, never per call.

use crate::error::{EngineError, Result};
use riskgate_core::clamp01;
use std::collections::HashMap;

/// Rule score at or above which a rule counts as fired
pub const RULE_FIRED_THRESHOLD: f64 = 0.2;

/// Velocity count multiple of the limit at which a velocity signal
/// counts as fired
pub const VELOCITY_FIRED_MULTIPLE: i64 = 2;

/// Signal names for the velocity scopes in the weight table
pub const VELOCITY_IP: &str = "velocity_ip";
pub const VELOCITY_USER: &str = "velocity_user";

const WEIGHT_SUM_EPSILON: f64 = 1e-9;

/// Declared signal weights; must sum to exactly 1.0
#[derive(Debug, Clone)]
pub struct WeightTable {
    weights: Vec<(String, f64)>,
}

impl WeightTable {
    /// Build a weight table, validating the sum invariant
    pub fn new(weights: Vec<(String, f64)>) -> Result<Self> {
        let sum: f64 = weights.iter().map(|(_, w)| w).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(EngineError::InvalidConfig(format!(
                "aggregation weights must sum to 1.0, got {}",
                sum
            )));
        }
        if weights.iter().any(|(_, w)| *w < 0.0) {
            return Err(EngineError::InvalidConfig(
                "aggregation weights must be non-negative".to_string(),
            ));
        }
        Ok(Self { weights })
    }

    /// The standard production weight table
    pub fn standard() -> Self {
        // Documented policy; any change here is a policy change
        Self::new(vec![
            (VELOCITY_IP.to_string(), 0.15),
            (VELOCITY_USER.to_string(), 0.10),
            ("shipping_mismatch".to_string(), 0.20),
            ("email".to_string(), 0.10),
            ("ip".to_string(), 0.15),
            ("payment_pattern".to_string(), 0.20),
            ("user_history".to_string(), 0.10),
        ])
        .expect("standard weight table sums to 1.0")
    }

    /// Weight for a signal, zero when undeclared
    pub fn weight(&self, name: &str) -> f64 {
        self.weights
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, w)| *w)
            .unwrap_or(0.0)
    }

    /// Declared signal names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.weights.iter().map(|(n, _)| n.as_str())
    }
}

/// Weighted linear combiner over named signal scores
#[derive(Debug, Clone)]
pub struct ScoreAggregator {
    table: WeightTable,
}

impl ScoreAggregator {
    pub fn new(table: WeightTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &WeightTable {
        &self.table
    }

    /// Combine signal scores into the heuristic score.
    ///
    /// Signals missing from the map contribute zero; the result is
    /// clamped to [0, 1].
    pub fn combine(&self, signals: &HashMap<String, f64>) -> f64 {
        let sum = self
            .table
            .weights
            .iter()
            .map(|(name, weight)| weight * signals.get(name).copied().unwrap_or(0.0))
            .sum();
        clamp01(sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_sums_to_one() {
        let table = WeightTable::standard();
        let sum: f64 = table.names().map(|n| table.weight(n)).sum();
        assert!((sum - 1.0).abs() < WEIGHT_SUM_EPSILON);
    }

    #[test]
    fn test_bad_sum_rejected() {
        let result = WeightTable::new(vec![("a".to_string(), 0.5), ("b".to_string(), 0.6)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let result = WeightTable::new(vec![("a".to_string(), 1.5), ("b".to_string(), -0.5)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_combine_weighted_sum() {
        let table =
            WeightTable::new(vec![("a".to_string(), 0.25), ("b".to_string(), 0.75)]).unwrap();
        let aggregator = ScoreAggregator::new(table);

        let mut signals = HashMap::new();
        signals.insert("a".to_string(), 1.0);
        signals.insert("b".to_string(), 0.4);

        // 0.25 * 1.0 + 0.75 * 0.4 = 0.55
        assert!((aggregator.combine(&signals) - 0.55).abs() < 1e-9);
    }

    #[test]
    fn test_missing_signals_contribute_zero() {
        let aggregator = ScoreAggregator::new(WeightTable::standard());
        let signals = HashMap::new();
        assert_eq!(aggregator.combine(&signals), 0.0);
    }

    #[test]
    fn test_undeclared_signals_ignored() {
        let table = WeightTable::new(vec![("a".to_string(), 1.0)]).unwrap();
        let aggregator = ScoreAggregator::new(table);

        let mut signals = HashMap::new();
        signals.insert("a".to_string(), 0.5);
        signals.insert("rogue".to_string(), 1.0);

        assert_eq!(aggregator.combine(&signals), 0.5);
    }

    #[test]
    fn test_result_stays_in_unit_interval() {
        let aggregator = ScoreAggregator::new(WeightTable::standard());
        let signals: HashMap<String, f64> = aggregator
            .table()
            .names()
            .map(|n| (n.to_string(), 1.0))
            .collect();
        let score = aggregator.combine(&signals);
        assert!(score <= 1.0 && score >= 0.0);
        assert!((score - 1.0).abs() < 1e-9);
    }
}
