//! Router error types

use thiserror::Error;

/// Router-specific errors
#[derive(Debug, Error)]
pub enum RouterError {
    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Invalid sink specification (command line form)
    #[error("invalid sink spec '{spec}': {message}")]
    InvalidSinkSpec { spec: String, message: String },

    /// Error from a contract boundary
    #[error("sink error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RouterError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn invalid_sink_spec(spec: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSinkSpec {
            spec: spec.into(),
            message: message.into(),
        }
    }
}
