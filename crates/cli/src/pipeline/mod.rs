//! Pipeline orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{DeviceSource, Pipeline, PipelineConfig, StopReason};
pub use stats::PipelineStats;
