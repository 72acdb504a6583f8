//! Channel naming rules

use contracts::{ChannelKey, SerialNumber, TransformEntry};

/// Namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "cepton";

/// Derives channel names for routes
///
/// | route                     | points                | status                             |
/// |---------------------------|-----------------------|------------------------------------|
/// | default (no config)       | `ns/points`           | `ns/sensor_information`            |
/// | configured, `topic_name`  | `ns/<topic_name>`     | `ns/<topic_name>_info`             |
/// | configured, no topic name | `ns/points_<serial>`  | `ns/sensor_information_<serial>`   |
/// | synthesized at runtime    | `ns/points_<serial>`  | `ns/sensor_info_<serial>`          |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteNaming {
    namespace: String,
}

impl Default for RouteNaming {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl RouteNaming {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into().trim_matches('/').to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn channel(&self, name: &str) -> ChannelKey {
        if self.namespace.is_empty() {
            ChannelKey::from(name)
        } else {
            ChannelKey::from(format!("{}/{}", self.namespace, name))
        }
    }

    pub fn default_points(&self) -> ChannelKey {
        self.channel("points")
    }

    pub fn default_status(&self) -> ChannelKey {
        self.channel("sensor_information")
    }

    pub fn configured_points(&self, entry: &TransformEntry) -> ChannelKey {
        match &entry.topic_name {
            Some(topic) => self.channel(topic),
            None => self.channel(&format!("points_{}", entry.serial_number)),
        }
    }

    pub fn configured_status(&self, entry: &TransformEntry) -> ChannelKey {
        match &entry.topic_name {
            Some(topic) => self.channel(&format!("{topic}_info")),
            None => self.channel(&format!("sensor_information_{}", entry.serial_number)),
        }
    }

    pub fn synthesized_points(&self, serial_number: SerialNumber) -> ChannelKey {
        self.channel(&format!("points_{serial_number}"))
    }

    pub fn synthesized_status(&self, serial_number: SerialNumber) -> ChannelKey {
        self.channel(&format!("sensor_info_{serial_number}"))
    }
}
