//! # Ingestion
//!
//! Per-frame processing between the device interface and publication.
//!
//! - `FrameAssemblyBuffer`: reusable single-frame buffer, image-space in,
//!   Cartesian frame out
//! - `IngestionCallback`: status lookup, routing and publication of one frame
//! - `FrameEventLoop`: bounded bridge from the device thread to one consumer
//!   task driving the callback

mod buffer;
mod callback;
mod error;
mod metrics;
mod pipeline;
mod projection;

pub use buffer::FrameAssemblyBuffer;
pub use callback::{host_now_usec, Clock, FrameOutcome, IngestionCallback};
pub use error::{IngestionError, Result};
pub use metrics::{IngestionMetrics, MetricsSnapshot};
pub use pipeline::{FrameEventLoop, DEFAULT_EVENT_CAPACITY};
pub use projection::image_to_cartesian;
