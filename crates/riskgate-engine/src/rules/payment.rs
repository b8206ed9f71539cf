//! Payment instrument pattern rule

use super::RuleEvaluator;
use crate::lookup::BinDirectory;
use async_trait::async_trait;
use riskgate_core::{clamp01, EvaluationContext, RuleResult};
use std::sync::Arc;

const COUNTRY_MISMATCH_BASE: f64 = 0.8;
const MATCH_BASE: f64 = 0.05;
const LOOKUP_ERROR_SCORE: f64 = 0.1;

/// Amount tier 1 in minor units ($1,000): adds 0.15
const AMOUNT_TIER_1: i64 = 100_000;
const TIER_1_INCREMENT: f64 = 0.15;

/// Amount tier 2 in minor units ($5,000): adds a further 0.10
const AMOUNT_TIER_2: i64 = 500_000;
const TIER_2_INCREMENT: f64 = 0.10;

/// Scores the card BIN: an issuing country that disagrees with the
/// billing country is the primary signal, with fixed increments stacked
/// on top for large amounts. No BIN supplied is not penalized.
pub struct PaymentPatternRule {
    bins: Option<Arc<dyn BinDirectory>>,
}

impl PaymentPatternRule {
    pub fn new(bins: Option<Arc<dyn BinDirectory>>) -> Self {
        Self { bins }
    }

    fn amount_increment(amount_minor: i64) -> f64 {
        let mut increment = 0.0;
        if amount_minor > AMOUNT_TIER_1 {
            increment += TIER_1_INCREMENT;
        }
        if amount_minor > AMOUNT_TIER_2 {
            increment += TIER_2_INCREMENT;
        }
        increment
    }
}

#[async_trait]
impl RuleEvaluator for PaymentPatternRule {
    fn name(&self) -> &'static str {
        "payment_pattern"
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> RuleResult {
        let bin = match &ctx.card_bin {
            Some(bin) => bin,
            None => return RuleResult::new(0.0, "no_bin"),
        };

        let bins = match &self.bins {
            Some(bins) => bins,
            None => return RuleResult::new(MATCH_BASE, "no_lookup"),
        };

        let info = match bins.lookup(bin).await {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!(bin = %bin, error = %e, "bin lookup failed, degrading");
                return RuleResult::new(LOOKUP_ERROR_SCORE, "lookup_error");
            }
        };

        let billing_country = ctx.billing.as_ref().map(|a| a.country.as_str());
        let mismatch = match (&info.country, billing_country) {
            (Some(issuing), Some(billing)) => !issuing.eq_ignore_ascii_case(billing),
            _ => false,
        };

        let base = if mismatch {
            COUNTRY_MISMATCH_BASE
        } else {
            MATCH_BASE
        };
        let score = clamp01(base + Self::amount_increment(ctx.amount_minor));

        let reason = if mismatch {
            "issuing_country_mismatch"
        } else {
            "issuing_country_match"
        };

        let mut result = RuleResult::new(score, reason);
        if let Some(issuing) = &info.country {
            result = result.with_detail("issuing_country", serde_json::json!(issuing));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::MockBinDirectory;
    use riskgate_core::Address;

    fn ctx(bin: Option<&str>, billing: Option<&str>, amount_minor: i64) -> EvaluationContext {
        let mut builder = EvaluationContext::builder().amount_minor(amount_minor);
        if let Some(bin) = bin {
            builder = builder.card_bin(bin);
        }
        if let Some(country) = billing {
            builder = builder.billing(Address::new(country));
        }
        builder.build()
    }

    #[tokio::test]
    async fn test_no_bin_not_penalized() {
        let rule = PaymentPatternRule::new(Some(Arc::new(MockBinDirectory::with_country("GB"))));
        let result = rule.evaluate(&ctx(None, Some("US"), 5_000)).await;
        assert_eq!(result.score, 0.0);
        assert_eq!(result.reason, "no_bin");
    }

    #[tokio::test]
    async fn test_country_mismatch_scores_base() {
        let rule = PaymentPatternRule::new(Some(Arc::new(MockBinDirectory::with_country("GB"))));
        let result = rule.evaluate(&ctx(Some("411111"), Some("US"), 5_000)).await;
        assert_eq!(result.score, 0.8);
        assert_eq!(result.reason, "issuing_country_mismatch");
    }

    #[tokio::test]
    async fn test_country_match_scores_low() {
        let rule = PaymentPatternRule::new(Some(Arc::new(MockBinDirectory::with_country("US"))));
        let result = rule.evaluate(&ctx(Some("411111"), Some("US"), 5_000)).await;
        assert_eq!(result.score, 0.05);
    }

    #[tokio::test]
    async fn test_amount_tiers_stack_and_clamp() {
        let rule = PaymentPatternRule::new(Some(Arc::new(MockBinDirectory::with_country("GB"))));

        // above tier 1: 0.8 + 0.15
        let result = rule
            .evaluate(&ctx(Some("411111"), Some("US"), 150_000))
            .await;
        assert!((result.score - 0.95).abs() < 1e-9);

        // above tier 2: 0.8 + 0.15 + 0.10, clamped to 1.0
        let result = rule
            .evaluate(&ctx(Some("411111"), Some("US"), 600_000))
            .await;
        assert_eq!(result.score, 1.0);
    }

    #[tokio::test]
    async fn test_amount_tiers_apply_without_mismatch() {
        let rule = PaymentPatternRule::new(Some(Arc::new(MockBinDirectory::with_country("US"))));
        let result = rule
            .evaluate(&ctx(Some("411111"), Some("US"), 600_000))
            .await;
        assert!((result.score - 0.3).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_missing_billing_is_not_a_mismatch() {
        let rule = PaymentPatternRule::new(Some(Arc::new(MockBinDirectory::with_country("GB"))));
        let result = rule.evaluate(&ctx(Some("411111"), None, 5_000)).await;
        assert_eq!(result.score, 0.05);
    }

    #[tokio::test]
    async fn test_lookup_error_is_mild_uncertainty() {
        let rule = PaymentPatternRule::new(Some(Arc::new(MockBinDirectory::failing())));
        let result = rule.evaluate(&ctx(Some("411111"), Some("US"), 5_000)).await;
        assert_eq!(result.score, 0.1);
        assert_eq!(result.reason, "lookup_error");
    }
}
