//! Error types for CLI operations.

use std::net::Ipv4Addr;

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Multicast group join failed
    #[error("Failed to join multicast group {group} on {interface}:{port}: {source}")]
    MulticastJoin {
        group: Ipv4Addr,
        interface: Ipv4Addr,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Configured sink specification rejected
    #[error("Invalid sink configuration: {0}")]
    Sink(#[from] router::RouterError),

    /// Command-line value out of range
    #[error("Invalid value for --{name}: {message}")]
    InvalidArgument { name: &'static str, message: String },
}

impl CliError {
    pub fn multicast_join(
        group: Ipv4Addr,
        interface: Ipv4Addr,
        port: u16,
        source: std::io::Error,
    ) -> Self {
        Self::MulticastJoin {
            group,
            interface,
            port,
            source,
        }
    }

    pub fn invalid_argument(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
