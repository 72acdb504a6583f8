//! # Device
//!
//! `DeviceInterface` implementations that do not need sensor hardware:
//! a synthetic `MockDevice` and a capture-driven `ReplayDevice`.

mod error;
mod mock_device;
mod replay_device;

pub use error::{DeviceError, Result};
pub use mock_device::{MockDevice, MockDeviceConfig};
pub use replay_device::{ReplayConfig, ReplayDevice};
