//! User history risk rule

use super::RuleEvaluator;
use async_trait::async_trait;
use riskgate_core::{clamp01, EvaluationContext, RuleResult};

const CHARGEBACK_WEIGHT: f64 = 0.3;
const RETURN_RATE_WEIGHT: f64 = 0.5;

/// Scores supplied user history directly (no lookup):
/// `min(1, chargebacks * 0.3 + return_rate * 0.5)`
pub struct UserHistoryRule;

#[async_trait]
impl RuleEvaluator for UserHistoryRule {
    fn name(&self) -> &'static str {
        "user_history"
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> RuleResult {
        let chargebacks = ctx.signals.chargeback_count as f64;
        let return_rate = ctx.signals.historical_return_rate;

        let score = clamp01(chargebacks * CHARGEBACK_WEIGHT + return_rate * RETURN_RATE_WEIGHT);

        let reason = if score > 0.0 { "history" } else { "clean_history" };
        RuleResult::new(score, reason)
            .with_detail("chargeback_count", serde_json::json!(ctx.signals.chargeback_count))
            .with_detail("return_rate", serde_json::json!(return_rate))
    }
}
