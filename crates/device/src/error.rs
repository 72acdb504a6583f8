//! Device error types

use std::path::PathBuf;

use contracts::ContractError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
    /// Capture file could not be opened or read
    #[error("failed to read capture '{path}': {source}")]
    CaptureRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A capture line is not a valid frame record
    #[error("invalid capture record at {path}:{line}: {message}")]
    CaptureParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Mock device configured without sensors
    #[error("mock device needs at least one serial number")]
    NoSensors,
}

impl From<DeviceError> for ContractError {
    fn from(e: DeviceError) -> Self {
        match e {
            DeviceError::CaptureRead { .. } | DeviceError::CaptureParse { .. } => {
                ContractError::Replay {
                    message: e.to_string(),
                }
            }
            DeviceError::NoSensors => ContractError::device_init(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DeviceError>;
