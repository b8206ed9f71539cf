//! Rule evaluators and the rule registry
//!
//! Each evaluator is an independent scoring capability over a subset of
//! the evaluation context. Evaluators are registered by name; the
//! aggregator weighs their scores without knowing anything about them, so
//! new rules are added here without touching the aggregation.

pub mod address;
pub mod email;
pub mod history;
pub mod ip;
pub mod payment;

pub use address::ShippingMismatchRule;
pub use email::EmailRiskRule;
pub use history::UserHistoryRule;
pub use ip::IpRiskRule;
pub use payment::PaymentPatternRule;

use async_trait::async_trait;
use riskgate_core::{EvaluationContext, RuleResult};
use std::collections::HashMap;
use std::sync::Arc;

/// A named, independent rule evaluator.
///
/// Evaluation never fails: lookup-backed evaluators degrade to their
/// documented conservative defaults on any error.
#[async_trait]
pub trait RuleEvaluator: Send + Sync {
    /// Registry name; also the key in the persisted score breakdown
    fn name(&self) -> &'static str;

    async fn evaluate(&self, ctx: &EvaluationContext) -> RuleResult;
}

/// Ordered registry of rule evaluators (name -> evaluator)
pub struct RuleRegistry {
    rules: Vec<Arc<dyn RuleEvaluator>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Register an evaluator; replaces any evaluator with the same name
    pub fn register(&mut self, rule: Arc<dyn RuleEvaluator>) {
        self.rules.retain(|r| r.name() != rule.name());
        self.rules.push(rule);
    }

    /// Look up an evaluator by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn RuleEvaluator>> {
        self.rules.iter().find(|r| r.name() == name)
    }

    /// Registered names, in registration order
    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate every registered rule concurrently
    pub async fn evaluate_all(&self, ctx: &EvaluationContext) -> HashMap<String, RuleResult> {
        let futures = self.rules.iter().map(|rule| async {
            let result = rule.evaluate(ctx).await;
            (rule.name().to_string(), result)
        });

        futures::future::join_all(futures).await.into_iter().collect()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRule {
        name: &'static str,
        score: f64,
    }

    #[async_trait]
    impl RuleEvaluator for FixedRule {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn evaluate(&self, _ctx: &EvaluationContext) -> RuleResult {
            RuleResult::new(self.score, "fixed")
        }
    }

    #[tokio::test]
    async fn test_registry_evaluates_all_rules() {
        let mut registry = RuleRegistry::new();
        registry.register(Arc::new(FixedRule {
            name: "a",
            score: 0.3,
        }));
        registry.register(Arc::new(FixedRule {
            name: "b",
            score: 0.7,
        }));

        let ctx = EvaluationContext::builder().build();
        let results = registry.evaluate_all(&ctx).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results["a"].score, 0.3);
        assert_eq!(results["b"].score, 0.7);
    }

    #[tokio::test]
    async fn test_register_replaces_same_name() {
        let mut registry = RuleRegistry::new();
        registry.register(Arc::new(FixedRule {
            name: "a",
            score: 0.3,
        }));
        registry.register(Arc::new(FixedRule {
            name: "a",
            score: 0.9,
        }));

        assert_eq!(registry.len(), 1);
        let ctx = EvaluationContext::builder().build();
        let results = registry.evaluate_all(&ctx).await;
        assert_eq!(results["a"].score, 0.9);
    }

    #[test]
    fn test_names_preserve_registration_order() {
        let mut registry = RuleRegistry::new();
        registry.register(Arc::new(FixedRule {
            name: "z",
            score: 0.0,
        }));
        registry.register(Arc::new(FixedRule {
            name: "a",
            score: 0.0,
        }));

        assert_eq!(registry.names(), vec!["z", "a"]);
        assert!(registry.get("z").is_some());
        assert!(registry.get("missing").is_none());
    }
}
