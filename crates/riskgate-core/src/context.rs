//! Evaluation context supplied by the calling transaction flow
//!
//! The context is assembled once at the integration boundary (checkout,
//! payment, refund flow) and is immutable for the duration of one
//! evaluation. Amounts are expressed in **minor units** (cents); callers
//! convert before constructing the context.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};

/// Action being gated by the evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Checkout,
    Cart,
    Refund,
    Other,
}

impl ActionType {
    /// Stable string form for persistence
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Checkout => "checkout",
            ActionType::Cart => "cart",
            ActionType::Refund => "refund",
            ActionType::Other => "other",
        }
    }
}

/// Postal address; only the country code participates in scoring
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Address {
    /// ISO 3166-1 alpha-2 country code
    pub country: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

impl Address {
    pub fn new(country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            city: None,
            postal_code: None,
        }
    }
}

/// Precomputed signals supplied by upstream systems
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalSignals {
    /// Predicted probability the order will be returned
    pub predicted_return_probability: f64,

    /// Historical return rate for this user, in [0, 1]
    pub historical_return_rate: f64,

    /// Lifetime chargeback count for this user
    pub chargeback_count: u32,

    /// Brand trust score for the items in the basket
    pub brand_trust_score: f64,
}

/// Immutable input for one fraud evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationContext {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub billing: Option<Address>,
    pub shipping: Option<Address>,

    /// Amount in minor units (cents)
    pub amount_minor: i64,

    /// ISO 4217 currency code
    pub currency: String,

    /// Card BIN or equivalent instrument prefix
    pub card_bin: Option<String>,

    pub action: ActionType,

    #[serde(default)]
    pub signals: ExternalSignals,

    /// Flags raised by upstream anomaly detectors
    #[serde(default)]
    pub anomaly_flags: Vec<String>,
}

impl EvaluationContext {
    /// Start building a context
    pub fn builder() -> EvaluationContextBuilder {
        EvaluationContextBuilder::new()
    }

    /// Boundary validation for integration callers.
    ///
    /// Evaluation itself never rejects a context; callers that accept
    /// untrusted input run this before handing the context to the engine.
    pub fn validate(&self) -> Result<()> {
        if self.amount_minor < 0 {
            return Err(CoreError::invalid_field(
                "amount_minor",
                "amount must be non-negative",
            ));
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CoreError::invalid_field(
                "currency",
                "expected an ISO 4217 alpha-3 code",
            ));
        }
        if let Some(email) = &self.email {
            if !email.contains('@') {
                return Err(CoreError::invalid_field("email", "missing '@'"));
            }
        }
        Ok(())
    }
}

/// Builder for [`EvaluationContext`]
#[derive(Debug, Clone)]
pub struct EvaluationContextBuilder {
    inner: EvaluationContext,
}

impl EvaluationContextBuilder {
    pub fn new() -> Self {
        Self {
            inner: EvaluationContext {
                user_id: None,
                email: None,
                ip: None,
                user_agent: None,
                billing: None,
                shipping: None,
                amount_minor: 0,
                currency: "USD".to_string(),
                card_bin: None,
                action: ActionType::Checkout,
                signals: ExternalSignals::default(),
                anomaly_flags: Vec::new(),
            },
        }
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.inner.user_id = Some(user_id.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.inner.email = Some(email.into());
        self
    }

    pub fn ip(mut self, ip: impl Into<String>) -> Self {
        self.inner.ip = Some(ip.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.inner.user_agent = Some(user_agent.into());
        self
    }

    pub fn billing(mut self, address: Address) -> Self {
        self.inner.billing = Some(address);
        self
    }

    pub fn shipping(mut self, address: Address) -> Self {
        self.inner.shipping = Some(address);
        self
    }

    /// Amount in minor units (cents)
    pub fn amount_minor(mut self, amount: i64) -> Self {
        self.inner.amount_minor = amount;
        self
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.inner.currency = currency.into();
        self
    }

    pub fn card_bin(mut self, bin: impl Into<String>) -> Self {
        self.inner.card_bin = Some(bin.into());
        self
    }

    pub fn action(mut self, action: ActionType) -> Self {
        self.inner.action = action;
        self
    }

    pub fn signals(mut self, signals: ExternalSignals) -> Self {
        self.inner.signals = signals;
        self
    }

    pub fn anomaly_flag(mut self, flag: impl Into<String>) -> Self {
        self.inner.anomaly_flags.push(flag.into());
        self
    }

    pub fn build(self) -> EvaluationContext {
        self.inner
    }
}

impl Default for EvaluationContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
