//! Layered error definitions
//!
//! Categorized by source: config / device / publish / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Device Errors =====
    /// Device interface failed to initialize or start capture
    #[error("device init error: {message}")]
    DeviceInit { message: String },

    /// Status query failed for one sensor
    #[error("status query failed for sensor handle {handle}: {message}")]
    StatusQuery { handle: u64, message: String },

    /// Capture replay error
    #[error("replay error: {message}")]
    Replay { message: String },

    // ===== Publication Errors =====
    /// Handoff to an output channel failed
    #[error("publish to '{channel}' failed: {message}")]
    Publish { channel: String, message: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    /// Sink connection error
    #[error("sink '{sink_name}' connection error: {message}")]
    SinkConnection { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create device init error
    pub fn device_init(message: impl Into<String>) -> Self {
        Self::DeviceInit {
            message: message.into(),
        }
    }

    /// Create status query error
    pub fn status_query(handle: u64, message: impl Into<String>) -> Self {
        Self::StatusQuery {
            handle,
            message: message.into(),
        }
    }

    /// Create publish error
    pub fn publish(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Publish {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}
