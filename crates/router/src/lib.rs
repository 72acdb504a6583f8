//! # Router
//!
//! Sensor routing and publication.
//!
//! - `SensorRouteRegistry`: serial number → output channels, with the
//!   exact / default / synthesized fallback
//! - `Publisher`: non-blocking fan-out of publications to sink workers
//! - Sinks: log, file and UDP backends, each behind an isolated queue

pub mod error;
pub mod factory;
pub mod handle;
pub mod metrics;
pub mod naming;
pub mod publisher;
pub mod registry;
pub mod sinks;

pub use contracts::{DataSink, OutboundMessage, PublicationSink};
pub use error::RouterError;
pub use factory::{create_sink_handle, parse_sink_spec};
pub use handle::{SendOutcome, SinkHandle};
pub use metrics::{KindCounts, MetricsSnapshot, SinkMetrics};
pub use naming::{RouteNaming, DEFAULT_NAMESPACE};
pub use publisher::Publisher;
pub use registry::{SensorRouteRegistry, DEFAULT_FRAME_ID};
pub use sinks::{FileSink, LogSink, NetworkSink};
