//! Publication interfaces
//!
//! `PublicationSink` is what the routing core publishes through; `DataSink`
//! is the async backend a publication hub fans out to.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    AssembledFrame, ChannelKey, ChannelKind, ContractError, OutboundMessage, SensorStatusMessage,
    StaticTransform,
};

/// Borrowed payload handed to `PublicationSink::publish`
#[derive(Debug, Clone, Copy)]
pub enum Publication<'a> {
    PointCloud(&'a AssembledFrame),
    Status(&'a SensorStatusMessage),
    Transform(&'a StaticTransform),
}

/// Publication capability used by the routing core
///
/// `publish` is a non-blocking handoff: implementations copy what they need
/// and return immediately.
pub trait PublicationSink: Send + Sync {
    /// Announce a channel before its first publication
    fn advertise(&self, _channel: &ChannelKey, _kind: ChannelKind) {}

    /// Hand one payload to the transport
    ///
    /// # Errors
    /// Returns a publish error if the handoff failed (message dropped)
    fn publish(&self, channel: &ChannelKey, publication: Publication<'_>)
        -> Result<(), ContractError>;
}

impl<T: PublicationSink + ?Sized> PublicationSink for Arc<T> {
    fn advertise(&self, channel: &ChannelKey, kind: ChannelKind) {
        (**self).advertise(channel, kind)
    }

    fn publish(
        &self,
        channel: &ChannelKey,
        publication: Publication<'_>,
    ) -> Result<(), ContractError> {
        (**self).publish(channel, publication)
    }
}

/// Data output trait
///
/// All sink backends implement this trait.
#[trait_variant::make(DataSink: Send)]
pub trait LocalDataSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one outbound message
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, message: &OutboundMessage) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}

/// Sink output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log output
    Log,
    /// File output
    File,
    /// Network output (UDP)
    Network,
}
