//! Route records kept by the sensor route registry.

use serde::{Deserialize, Serialize};

use crate::{ChannelKey, SerialNumber};

/// The two channel kinds every route carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Point-cloud stream
    Points,
    /// Device-status stream
    Status,
}

/// Serial number → output channels + frame id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorRoute {
    pub serial_number: SerialNumber,
    pub frame_id: String,
    pub point_channel: ChannelKey,
    pub status_channel: ChannelKey,
}

/// Which fallback tier resolved a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteTier {
    /// Route registered for the exact serial number
    Exact,
    /// Folded into the default route (serial 0)
    Default,
    /// Ad-hoc route created for this serial number
    Synthesized,
}

/// Result of resolving one channel kind for a serial number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedChannel {
    pub channel: ChannelKey,
    pub tier: RouteTier,
}
