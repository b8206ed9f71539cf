//! Core error types

use thiserror::Error;

/// Core error
#[derive(Error, Debug)]
pub enum CoreError {
    /// A context field failed boundary validation
    #[error("Invalid context field '{field}': {message}")]
    InvalidField { field: String, message: String },
}

impl CoreError {
    /// Create a field validation error
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
