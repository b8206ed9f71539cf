//! RISKGATE Core - Core types for the RISKGATE fraud decision engine
//!
//! This crate provides the fundamental types shared across the engine:
//! - Evaluation context supplied by the calling transaction flow
//! - Rule results and score helpers
//! - Decision values
//! - The immutable fraud incident audit record
//! - Error types

pub mod context;
pub mod decision;
pub mod error;
pub mod incident;
pub mod rule;

// Re-export commonly used types
pub use context::{
    ActionType, Address, EvaluationContext, EvaluationContextBuilder, ExternalSignals,
};
pub use decision::Decision;
pub use error::CoreError;
pub use incident::FraudIncident;
pub use rule::{clamp01, RuleResult};
