//! RISKGATE Engine - Real-time fraud decision engine
//!
//! Combines independent deterministic rule evaluators, TTL-windowed
//! velocity counters, and an optional logistic model into a single
//! bounded score and a discrete decision, then records the full
//! evaluation as an immutable audit incident.
//!
//! Design stance: **fail open, never block the protected transaction.**
//! Every collaborator failure inside the pipeline (counter store,
//! reputation lookups, model, persistence, alerting) degrades to a
//! documented safe default; only configuration validation at
//! construction can error.

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod incident;
pub mod lookup;
pub mod model;
pub mod policy;
pub mod rules;
pub mod velocity;

// Re-export main types
pub use aggregate::{ScoreAggregator, WeightTable};
pub use config::{EngineConfig, VelocityScopeConfig};
pub use engine::{Evaluation, FraudEngine, FraudEngineBuilder};
pub use error::{EngineError, Result};
pub use incident::{
    AlertDispatcher, IncidentStore, IncidentWriter, MemoryIncidentStore, NoopAlertDispatcher,
    UserRiskProfile, WebhookAlertDispatcher,
};
#[cfg(feature = "sqlx")]
pub use incident::PgIncidentStore;
pub use lookup::{BinDirectory, BinInfo, BinListClient, IpInfoClient, IpIntel, IpIntelligence};
pub use model::{ModelProvider, RankerModel};
pub use policy::DecisionPolicy;
pub use rules::{RuleEvaluator, RuleRegistry};
pub use velocity::{CounterStore, MemoryCounterStore, VelocityLimiter, VelocityResult};
