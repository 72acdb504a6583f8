//! Ingestion error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestionError {
    /// The device refused to start delivering frames
    #[error("failed to start device '{device}': {source}")]
    DeviceStart {
        device: String,
        #[source]
        source: contracts::ContractError,
    },

    /// `start` called on a running event loop
    #[error("event loop already running")]
    AlreadyRunning,

    /// Frame receiver already taken
    #[error("frame receiver already taken")]
    ReceiverTaken,
}

pub type Result<T> = std::result::Result<T, IngestionError>;
