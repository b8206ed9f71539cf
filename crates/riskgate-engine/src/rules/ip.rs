//! IP reputation rule

use super::RuleEvaluator;
use crate::lookup::IpIntelligence;
use async_trait::async_trait;
use riskgate_core::{EvaluationContext, RuleResult};
use std::net::IpAddr;
use std::sync::Arc;

const DATACENTER_SCORE: f64 = 0.8;
const DEFAULT_SCORE: f64 = 0.05;
const LOOKUP_ERROR_SCORE: f64 = 0.1;

/// Organization keywords that mark a cloud/datacenter operator
/// (proxy/VPN heuristic)
const DATACENTER_KEYWORDS: &[&str] = &[
    "amazon",
    "aws",
    "google",
    "microsoft",
    "azure",
    "digitalocean",
    "ovh",
    "hetzner",
    "linode",
    "vultr",
    "alibaba",
    "oracle",
    "cloudflare",
    "hosting",
    "datacenter",
    "data center",
    "colo",
];

/// Scores the request IP via an external intelligence lookup.
///
/// Private/loopback addresses score 0. Without a configured lookup the
/// rule falls back to a small fixed default rather than guessing. A
/// failed lookup scores 0.1: mild uncertainty, not full trust.
pub struct IpRiskRule {
    intel: Option<Arc<dyn IpIntelligence>>,
}

impl IpRiskRule {
    pub fn new(intel: Option<Arc<dyn IpIntelligence>>) -> Self {
        Self { intel }
    }
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
        IpAddr::V6(v6) => {
            let segments = v6.segments();
            v6.is_loopback()
                || (segments[0] & 0xfe00) == 0xfc00 // unique local fc00::/7
                || (segments[0] & 0xffc0) == 0xfe80 // link local fe80::/10
        }
    }
}

fn is_datacenter_org(org: &str) -> bool {
    let org = org.to_ascii_lowercase();
    DATACENTER_KEYWORDS.iter().any(|k| org.contains(k))
}

#[async_trait]
impl RuleEvaluator for IpRiskRule {
    fn name(&self) -> &'static str {
        "ip"
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> RuleResult {
        let raw = match &ctx.ip {
            Some(ip) => ip,
            None => return RuleResult::new(0.0, "missing"),
        };

        let addr: IpAddr = match raw.parse() {
            Ok(addr) => addr,
            Err(_) => return RuleResult::new(0.0, "unparseable"),
        };

        if is_private_ip(&addr) {
            return RuleResult::new(0.0, "private");
        }

        let intel = match &self.intel {
            Some(intel) => intel,
            None => return RuleResult::new(DEFAULT_SCORE, "no_lookup"),
        };

        match intel.lookup(raw).await {
            Ok(info) => match info.org {
                Some(org) if is_datacenter_org(&org) => {
                    RuleResult::new(DATACENTER_SCORE, "datacenter_ip")
                        .with_detail("org", serde_json::json!(org))
                }
                _ => RuleResult::new(DEFAULT_SCORE, "clean"),
            },
            Err(e) => {
                tracing::warn!(ip = %raw, error = %e, "ip lookup failed, degrading");
                RuleResult::new(LOOKUP_ERROR_SCORE, "lookup_error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::MockIpIntelligence;

    fn ctx(ip: &str) -> EvaluationContext {
        EvaluationContext::builder().ip(ip).build()
    }

    #[tokio::test]
    async fn test_private_ranges_score_zero() {
        let rule = IpRiskRule::new(Some(Arc::new(MockIpIntelligence::with_org("Amazon"))));
        for ip in ["10.0.0.1", "192.168.1.5", "127.0.0.1", "::1", "fe80::1"] {
            let result = rule.evaluate(&ctx(ip)).await;
            assert_eq!(result.score, 0.0, "ip {}", ip);
            assert_eq!(result.reason, "private");
        }
    }

    #[tokio::test]
    async fn test_no_lookup_configured_small_default() {
        let rule = IpRiskRule::new(None);
        let result = rule.evaluate(&ctx("203.0.113.7")).await;
        assert_eq!(result.score, 0.05);
        assert_eq!(result.reason, "no_lookup");
    }

    #[tokio::test]
    async fn test_datacenter_org_scores_high() {
        let rule = IpRiskRule::new(Some(Arc::new(MockIpIntelligence::with_org(
            "AS16509 Amazon.com, Inc.",
        ))));
        let result = rule.evaluate(&ctx("203.0.113.7")).await;
        assert_eq!(result.score, 0.8);
        assert_eq!(result.reason, "datacenter_ip");
    }

    #[tokio::test]
    async fn test_residential_org_scores_default() {
        let rule = IpRiskRule::new(Some(Arc::new(MockIpIntelligence::with_org(
            "AS7922 Comcast Cable",
        ))));
        let result = rule.evaluate(&ctx("203.0.113.7")).await;
        assert_eq!(result.score, 0.05);
        assert_eq!(result.reason, "clean");
    }

    #[tokio::test]
    async fn test_lookup_error_is_mild_uncertainty() {
        let rule = IpRiskRule::new(Some(Arc::new(MockIpIntelligence::failing())));
        let result = rule.evaluate(&ctx("203.0.113.7")).await;
        assert_eq!(result.score, 0.1);
        assert_eq!(result.reason, "lookup_error");
    }

    #[tokio::test]
    async fn test_missing_and_unparseable_score_zero() {
        let rule = IpRiskRule::new(None);

        let result = rule.evaluate(&EvaluationContext::builder().build()).await;
        assert_eq!(result.score, 0.0);

        let result = rule.evaluate(&ctx("not-an-ip")).await;
        assert_eq!(result.score, 0.0);
        assert_eq!(result.reason, "unparseable");
    }
}
