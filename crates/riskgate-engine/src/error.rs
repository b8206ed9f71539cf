//! Engine error types

use thiserror::Error;

/// Engine error
///
/// Runtime failures inside the evaluation pipeline are degraded to safe
/// defaults rather than surfaced; these variants appear at construction
/// boundaries (configuration, model load) and inside collaborator
/// implementations before the fail-open handling catches them.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Counter store failure
    #[error("Counter store error: {0}")]
    Store(String),

    /// External lookup failure
    #[error("Lookup failed: {0}")]
    Lookup(String),

    /// Model file could not be loaded or is inconsistent
    #[error("Model load failed: {0}")]
    ModelLoad(String),

    /// Incident persistence failure
    #[error("Persistence failed: {0}")]
    Persistence(String),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
