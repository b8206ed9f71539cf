//! Email domain risk rule

use super::RuleEvaluator;
use async_trait::async_trait;
use riskgate_core::{EvaluationContext, RuleResult};

const DISPOSABLE_SCORE: f64 = 0.9;
const FREE_WEBMAIL_SCORE: f64 = 0.1;

/// Curated disposable-provider patterns, matched as substrings of the domain
const DISPOSABLE_PATTERNS: &[&str] = &[
    "mailinator",
    "guerrillamail",
    "10minutemail",
    "tempmail",
    "temp-mail",
    "throwaway",
    "yopmail",
    "trashmail",
    "sharklasers",
    "dispostable",
    "getnada",
    "maildrop",
    "fakeinbox",
    "mintemail",
];

/// Common free-webmail domains, matched exactly
const FREE_WEBMAIL_DOMAINS: &[&str] = &[
    "gmail.com",
    "yahoo.com",
    "hotmail.com",
    "outlook.com",
    "aol.com",
    "icloud.com",
    "live.com",
    "msn.com",
    "protonmail.com",
    "proton.me",
    "gmx.com",
    "mail.com",
    "zoho.com",
    "yandex.com",
];

/// Scores the email's domain: disposable providers are high risk, free
/// webmail mildly elevated, everything else (private/business domains)
/// implicitly trusted.
pub struct EmailRiskRule;

#[async_trait]
impl RuleEvaluator for EmailRiskRule {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn evaluate(&self, ctx: &EvaluationContext) -> RuleResult {
        let email = match &ctx.email {
            Some(email) => email,
            None => return RuleResult::new(0.0, "missing"),
        };

        let domain = match email.rsplit_once('@') {
            Some((_, domain)) if !domain.is_empty() => domain.to_ascii_lowercase(),
            _ => return RuleResult::new(0.0, "missing"),
        };

        if DISPOSABLE_PATTERNS.iter().any(|p| domain.contains(p)) {
            return RuleResult::new(DISPOSABLE_SCORE, "disposable_domain")
                .with_detail("domain", serde_json::json!(domain));
        }

        if FREE_WEBMAIL_DOMAINS.contains(&domain.as_str()) {
            return RuleResult::new(FREE_WEBMAIL_SCORE, "free_webmail")
                .with_detail("domain", serde_json::json!(domain));
        }

        RuleResult::new(0.0, "trusted_domain")
    }
}
