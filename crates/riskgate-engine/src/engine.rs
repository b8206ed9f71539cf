//! Fraud engine assembly and the evaluation pipeline
//!
//! `evaluate()` is the single call the checkout/payment flow gates on.
//! The independent I/O-bound sub-evaluations (velocity increments and
//! the lookup-backed rules) are dispatched concurrently and joined
//! before aggregation, so total latency is bounded by the slowest
//! single lookup. Each lookup carries its own timeout; there is no
//! end-to-end deadline for the whole evaluation.

use crate::aggregate::{
    ScoreAggregator, WeightTable, RULE_FIRED_THRESHOLD, VELOCITY_FIRED_MULTIPLE, VELOCITY_IP,
    VELOCITY_USER,
};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::incident::{
    AlertDispatcher, IncidentStore, IncidentWriter, MemoryIncidentStore, NoopAlertDispatcher,
    UserRiskProfile,
};
use crate::lookup::{BinDirectory, BinListClient, IpInfoClient, IpIntelligence};
use crate::model::{blend, feature_vector, ModelProvider};
use crate::policy::DecisionPolicy;
use crate::rules::{
    EmailRiskRule, IpRiskRule, PaymentPatternRule, RuleEvaluator, RuleRegistry,
    ShippingMismatchRule, UserHistoryRule,
};
use crate::velocity::{CounterStore, MemoryCounterStore, VelocityLimiter, VelocityResult};
use riskgate_core::{Decision, EvaluationContext, FraudIncident};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// What the caller consumes; the full incident is retained for audit
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub incident_id: String,
    pub score: f64,
    pub decision: Decision,
    pub rules_fired: Vec<String>,
}

/// Real-time fraud decision engine
pub struct FraudEngine {
    config: EngineConfig,
    registry: RuleRegistry,
    aggregator: ScoreAggregator,
    policy: DecisionPolicy,
    velocity: VelocityLimiter,
    model: Arc<ModelProvider>,
    store: Arc<dyn IncidentStore>,
    writer: IncidentWriter,
    alerts: Arc<dyn AlertDispatcher>,
}

impl FraudEngine {
    /// Start building an engine
    pub fn builder() -> FraudEngineBuilder {
        FraudEngineBuilder::new()
    }

    /// Evaluate one context and gate the action.
    ///
    /// Infallible by construction: every collaborator failure inside the
    /// pipeline degrades to its documented default, and a decision is
    /// always produced.
    pub async fn evaluate(&self, ctx: &EvaluationContext) -> Evaluation {
        let started = std::time::Instant::now();

        let ip_velocity = async {
            match &ctx.ip {
                Some(ip) => {
                    self.velocity
                        .increment(
                            "ip",
                            ip,
                            Duration::from_secs(self.config.velocity_ip.window_secs),
                            self.config.velocity_ip.limit,
                        )
                        .await
                }
                None => VelocityResult::zero(),
            }
        };
        let user_velocity = async {
            match &ctx.user_id {
                Some(user_id) => {
                    self.velocity
                        .increment(
                            "user",
                            user_id,
                            Duration::from_secs(self.config.velocity_user.window_secs),
                            self.config.velocity_user.limit,
                        )
                        .await
                }
                None => VelocityResult::zero(),
            }
        };

        // Independent I/O joined, not chained
        let (vel_ip, vel_user, rule_results) = tokio::join!(
            ip_velocity,
            user_velocity,
            self.registry.evaluate_all(ctx)
        );

        let mut signals: HashMap<String, f64> = rule_results
            .iter()
            .map(|(name, result)| (name.clone(), result.score))
            .collect();
        signals.insert(VELOCITY_IP.to_string(), vel_ip.score);
        signals.insert(VELOCITY_USER.to_string(), vel_user.score);

        let heuristic_score = self.aggregator.combine(&signals);

        let model_score = self
            .model
            .current()
            .map(|model| model.probability(&feature_vector(ctx, heuristic_score, &signals)));

        let final_score = blend(self.config.model_alpha, heuristic_score, model_score);
        let decision = self.policy.decide(final_score);

        let rules_fired = self.rules_fired(&rule_results, vel_ip, vel_user);

        let incident = self.build_incident(
            ctx,
            rule_results,
            rules_fired.clone(),
            heuristic_score,
            model_score,
            final_score,
            decision,
        );
        let incident_id = incident.id.clone();

        // Persistence and alerting happen off the request path
        if incident.is_high_severity(self.config.alert_threshold) {
            let alerts = self.alerts.clone();
            let alert_incident = incident.clone();
            tokio::spawn(async move {
                if let Err(e) = alerts.dispatch(&alert_incident).await {
                    tracing::warn!(
                        incident_id = %alert_incident.id,
                        error = %e,
                        "alert dispatch failed"
                    );
                }
            });
        }
        self.writer.record(incident);

        tracing::info!(
            incident_id = %incident_id,
            score = final_score,
            decision = %decision,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fraud evaluation complete"
        );

        Evaluation {
            incident_id,
            score: final_score,
            decision,
            rules_fired,
        }
    }

    /// Re-read the model parameter file (explicit reload lifecycle)
    pub fn reload_model(&self) -> Result<()> {
        self.model.reload()
    }

    /// Update an incident's disposition after the fact
    pub async fn update_disposition(
        &self,
        incident_id: &str,
        decision: Decision,
        notes: Option<String>,
    ) -> Result<()> {
        self.store
            .update_disposition(incident_id, decision, notes)
            .await
    }

    /// Read back a user's persisted risk profile for context enrichment
    pub async fn user_profile(&self, user_id: &str) -> Result<Option<UserRiskProfile>> {
        self.store.user_profile(user_id).await
    }

    /// Registered rule names
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.registry.names()
    }

    fn rules_fired(
        &self,
        rule_results: &HashMap<String, riskgate_core::RuleResult>,
        vel_ip: VelocityResult,
        vel_user: VelocityResult,
    ) -> Vec<String> {
        let mut fired = Vec::new();
        for name in self.registry.names() {
            if let Some(result) = rule_results.get(name) {
                if result.score >= RULE_FIRED_THRESHOLD {
                    fired.push(name.to_string());
                }
            }
        }
        if vel_ip.count >= VELOCITY_FIRED_MULTIPLE * self.config.velocity_ip.limit {
            fired.push(VELOCITY_IP.to_string());
        }
        if vel_user.count >= VELOCITY_FIRED_MULTIPLE * self.config.velocity_user.limit {
            fired.push(VELOCITY_USER.to_string());
        }
        fired
    }

    #[allow(clippy::too_many_arguments)]
    fn build_incident(
        &self,
        ctx: &EvaluationContext,
        rule_results: HashMap<String, riskgate_core::RuleResult>,
        rules_fired: Vec<String>,
        heuristic_score: f64,
        model_score: Option<f64>,
        final_score: f64,
        decision: Decision,
    ) -> FraudIncident {
        let now = chrono::Utc::now();
        FraudIncident {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: ctx.user_id.clone(),
            email: ctx.email.clone(),
            ip: ctx.ip.clone(),
            user_agent: ctx.user_agent.clone(),
            action: ctx.action.as_str().to_string(),
            amount_minor: ctx.amount_minor,
            currency: ctx.currency.clone(),
            rule_results,
            rules_fired,
            heuristic_score,
            model_score,
            final_score,
            decision,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Builder wiring stores, lookup clients, alerting, and the model
pub struct FraudEngineBuilder {
    config: EngineConfig,
    weights: Option<WeightTable>,
    counter_store: Option<Arc<dyn CounterStore>>,
    incident_store: Option<Arc<dyn IncidentStore>>,
    alerts: Option<Arc<dyn AlertDispatcher>>,
    ip_intel: Option<Arc<dyn IpIntelligence>>,
    bins: Option<Arc<dyn BinDirectory>>,
    model: Option<ModelProvider>,
    extra_rules: Vec<Arc<dyn RuleEvaluator>>,
}

impl FraudEngineBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::new(),
            weights: None,
            counter_store: None,
            incident_store: None,
            alerts: None,
            ip_intel: None,
            bins: None,
            model: None,
            extra_rules: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the standard weight table (policy change)
    pub fn with_weights(mut self, weights: WeightTable) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn with_counter_store(mut self, store: Arc<dyn CounterStore>) -> Self {
        self.counter_store = Some(store);
        self
    }

    pub fn with_incident_store(mut self, store: Arc<dyn IncidentStore>) -> Self {
        self.incident_store = Some(store);
        self
    }

    pub fn with_alert_dispatcher(mut self, alerts: Arc<dyn AlertDispatcher>) -> Self {
        self.alerts = Some(alerts);
        self
    }

    pub fn with_ip_intelligence(mut self, intel: Arc<dyn IpIntelligence>) -> Self {
        self.ip_intel = Some(intel);
        self
    }

    pub fn with_bin_directory(mut self, bins: Arc<dyn BinDirectory>) -> Self {
        self.bins = Some(bins);
        self
    }

    pub fn with_model_provider(mut self, model: ModelProvider) -> Self {
        self.model = Some(model);
        self
    }

    /// Register an additional rule evaluator; give it a weight via
    /// [`with_weights`](Self::with_weights) or it contributes nothing
    pub fn with_rule(mut self, rule: Arc<dyn RuleEvaluator>) -> Self {
        self.extra_rules.push(rule);
        self
    }

    /// Validate configuration and assemble the engine
    pub fn build(self) -> Result<FraudEngine> {
        self.config.validate()?;

        let policy = DecisionPolicy::new(self.config.flag_threshold, self.config.deny_threshold)?;
        let aggregator = ScoreAggregator::new(self.weights.unwrap_or_else(WeightTable::standard));

        let counter_store = self
            .counter_store
            .unwrap_or_else(|| Arc::new(MemoryCounterStore::new()));
        let velocity = VelocityLimiter::new(counter_store);

        let ip_intel = self.ip_intel.or_else(|| {
            self.config
                .ipinfo_token
                .clone()
                .map(|token| Arc::new(IpInfoClient::new(token)) as Arc<dyn IpIntelligence>)
        });

        let bins = self.bins.unwrap_or_else(|| match &self.config.bin_api_base {
            Some(base) => Arc::new(BinListClient::with_base_url(base)),
            None => Arc::new(BinListClient::new()),
        });

        let mut registry = RuleRegistry::new();
        registry.register(Arc::new(ShippingMismatchRule));
        registry.register(Arc::new(EmailRiskRule));
        registry.register(Arc::new(IpRiskRule::new(ip_intel)));
        registry.register(Arc::new(PaymentPatternRule::new(Some(bins))));
        registry.register(Arc::new(UserHistoryRule));
        for rule in self.extra_rules {
            registry.register(rule);
        }

        let model = match self.model {
            Some(provider) => provider,
            None => match &self.config.model_path {
                Some(path) => match ModelProvider::load(path.clone()) {
                    Ok(provider) => provider,
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "model load failed, continuing without blending"
                        );
                        ModelProvider::disabled()
                    }
                },
                None => ModelProvider::disabled(),
            },
        };

        let store = self
            .incident_store
            .unwrap_or_else(|| Arc::new(MemoryIncidentStore::new()));
        let writer = IncidentWriter::new(store.clone());

        let alerts = self.alerts.unwrap_or_else(|| Arc::new(NoopAlertDispatcher));

        Ok(FraudEngine {
            config: self.config,
            registry,
            aggregator,
            policy,
            velocity,
            model: Arc::new(model),
            store,
            writer,
            alerts,
        })
    }
}

impl Default for FraudEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
