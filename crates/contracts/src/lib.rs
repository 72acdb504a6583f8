//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the driver.
//! Business crates depend on this crate only, never on each other in reverse.
//!
//! ## Time Model
//! - All timestamps are microseconds (`i64`)
//! - Point timestamps come from the device, frame/message stamps from the host clock

mod channel;
mod device;
mod error;
mod frame;
mod message;
mod route;
mod sensor;
mod sink;
mod transform;

pub use channel::ChannelKey;
pub use device::{
    DeviceInterface, DeviceOptions, FrameCallback, FrameMode, CONTROL_DISABLE_NETWORK,
    STREAMING_FRAME_LENGTH_SEC,
};
pub use error::*;
pub use frame::*;
pub use message::*;
pub use route::*;
pub use sensor::*;
pub use sink::*;
pub use transform::*;
