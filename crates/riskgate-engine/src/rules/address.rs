//! Shipping/billing address mismatch rule

use super::RuleEvaluator;
use async_trait::async_trait;
use riskgate_core::{EvaluationContext, RuleResult};

const MISMATCH_SCORE: f64 = 0.9;

/// Scores a country mismatch between billing and shipping addresses.
///
/// Missing data is never penalized: either address absent yields 0.0.
pub struct ShippingMismatchRule;

#[async_trait]
impl RuleEvaluator for ShippingMismatchRule {
    fn name(&self) -> &'static str {
        "shipping_mismatch"
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> RuleResult {
        let (billing, shipping) = match (&ctx.billing, &ctx.shipping) {
            (Some(b), Some(s)) => (b, s),
            _ => return RuleResult::new(0.0, "missing"),
        };

        if billing.country.eq_ignore_ascii_case(&shipping.country) {
            RuleResult::new(0.0, "match")
        } else {
            RuleResult::new(MISMATCH_SCORE, "country_mismatch")
                .with_detail("billing_country", serde_json::json!(billing.country))
                .with_detail("shipping_country", serde_json::json!(shipping.country))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskgate_core::Address;

    fn ctx(billing: Option<&str>, shipping: Option<&str>) -> EvaluationContext {
        let mut builder = EvaluationContext::builder();
        if let Some(country) = billing {
            builder = builder.billing(Address::new(country));
        }
        if let Some(country) = shipping {
            builder = builder.shipping(Address::new(country));
        }
        builder.build()
    }

    #[tokio::test]
    async fn test_same_country_scores_zero() {
        let result = ShippingMismatchRule
            .evaluate(&ctx(Some("US"), Some("US")))
            .await;
        assert_eq!(result.score, 0.0);
        assert_eq!(result.reason, "match");
    }

    #[tokio::test]
    async fn test_mismatch_scores_high() {
        let result = ShippingMismatchRule
            .evaluate(&ctx(Some("US"), Some("FR")))
            .await;
        assert_eq!(result.score, 0.9);
        assert_eq!(result.reason, "country_mismatch");
    }

    #[tokio::test]
    async fn test_comparison_is_case_insensitive() {
        let result = ShippingMismatchRule
            .evaluate(&ctx(Some("us"), Some("US")))
            .await;
        assert_eq!(result.score, 0.0);
    }

    #[tokio::test]
    async fn test_missing_address_not_penalized() {
        for (billing, shipping) in [(None, Some("US")), (Some("US"), None), (None, None)] {
            let result = ShippingMismatchRule.evaluate(&ctx(billing, shipping)).await;
            assert_eq!(result.score, 0.0);
            assert_eq!(result.reason, "missing");
        }
    }
}
