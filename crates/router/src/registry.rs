//! Sensor route registry
//!
//! Serial number → (point channel, status channel, frame id). Point and status
//! channels live in two independent tables, each resolved with the same
//! fallback:
//!
//! 1. exact serial number
//! 2. default route (serial 0), if registered in that table
//! 3. otherwise a synthesized route is registered for the serial number
//!
//! Tables only grow. Resolution of a known serial takes a shared read lock;
//! the write lock is taken only to register.

use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock};

use contracts::{
    ChannelKey, ChannelKind, ResolvedChannel, RouteTier, SensorRoute, SerialNumber,
    TransformEntry, DEFAULT_SERIAL_NUMBER,
};
use metrics::counter;
use tracing::{debug, info};

use crate::naming::RouteNaming;

/// Frame id used for serial numbers without a recorded frame id
pub const DEFAULT_FRAME_ID: &str = "cepton_0";

type ChannelTable = RwLock<HashMap<SerialNumber, ChannelKey>>;

/// Owned registry of sensor routes
#[derive(Debug)]
pub struct SensorRouteRegistry {
    naming: RouteNaming,
    default_frame_id: String,
    point_channels: ChannelTable,
    status_channels: ChannelTable,
    frame_ids: RwLock<HashMap<SerialNumber, String>>,
}

impl Default for SensorRouteRegistry {
    fn default() -> Self {
        Self::new(RouteNaming::default())
    }
}

impl SensorRouteRegistry {
    /// Create an empty registry
    pub fn new(naming: RouteNaming) -> Self {
        Self {
            naming,
            default_frame_id: DEFAULT_FRAME_ID.to_string(),
            point_channels: RwLock::new(HashMap::new()),
            status_channels: RwLock::new(HashMap::new()),
            frame_ids: RwLock::new(HashMap::new()),
        }
    }

    /// Build from loaded entries
    ///
    /// With `use_default_names` the serial-0 entry gets the default channel
    /// names (used when no configuration file was supplied).
    pub fn from_entries<'a>(
        naming: RouteNaming,
        entries: impl IntoIterator<Item = &'a TransformEntry>,
        use_default_names: bool,
    ) -> Self {
        let registry = Self::new(naming);
        for entry in entries {
            if use_default_names && entry.serial_number == DEFAULT_SERIAL_NUMBER {
                registry.register_default(&entry.frame_id);
            } else {
                registry.register(entry);
            }
        }
        registry
    }

    pub fn naming(&self) -> &RouteNaming {
        &self.naming
    }

    /// Register a configured sensor
    ///
    /// Channels already registered for the serial number are kept.
    pub fn register(&self, entry: &TransformEntry) -> SensorRoute {
        let point_channel = self.naming.configured_points(entry);
        let status_channel = self.naming.configured_status(entry);
        self.insert_route(entry.serial_number, &entry.frame_id, point_channel, status_channel)
    }

    /// Register the default route (serial 0) with the default channel names
    pub fn register_default(&self, frame_id: &str) -> SensorRoute {
        let point_channel = self.naming.default_points();
        let status_channel = self.naming.default_status();
        self.insert_route(DEFAULT_SERIAL_NUMBER, frame_id, point_channel, status_channel)
    }

    fn insert_route(
        &self,
        serial_number: SerialNumber,
        frame_id: &str,
        point_channel: ChannelKey,
        status_channel: ChannelKey,
    ) -> SensorRoute {
        let point_channel = write(&self.point_channels)
            .entry(serial_number)
            .or_insert(point_channel)
            .clone();
        let status_channel = write(&self.status_channels)
            .entry(serial_number)
            .or_insert(status_channel)
            .clone();
        let frame_id = write(&self.frame_ids)
            .entry(serial_number)
            .or_insert_with(|| frame_id.to_string())
            .clone();

        info!(
            serial_number,
            frame_id = %frame_id,
            points = %point_channel,
            status = %status_channel,
            "route registered"
        );

        SensorRoute {
            serial_number,
            frame_id,
            point_channel,
            status_channel,
        }
    }

    /// Resolve the point-cloud channel for a serial number
    pub fn resolve_points(&self, serial_number: SerialNumber) -> ResolvedChannel {
        self.resolve_in(ChannelKind::Points, serial_number)
    }

    /// Resolve the status channel for a serial number
    pub fn resolve_status(&self, serial_number: SerialNumber) -> ResolvedChannel {
        self.resolve_in(ChannelKind::Status, serial_number)
    }

    /// Resolve both channels and the frame id
    pub fn resolve(
        &self,
        serial_number: SerialNumber,
    ) -> (ResolvedChannel, ResolvedChannel, String) {
        (
            self.resolve_points(serial_number),
            self.resolve_status(serial_number),
            self.frame_id(serial_number),
        )
    }

    /// Frame id recorded for a serial number, or the default frame id
    pub fn frame_id(&self, serial_number: SerialNumber) -> String {
        read(&self.frame_ids)
            .get(&serial_number)
            .cloned()
            .unwrap_or_else(|| self.default_frame_id.clone())
    }

    fn resolve_in(&self, kind: ChannelKind, serial_number: SerialNumber) -> ResolvedChannel {
        let table = match kind {
            ChannelKind::Points => &self.point_channels,
            ChannelKind::Status => &self.status_channels,
        };

        if let Some(resolved) = lookup(&read(table), serial_number) {
            return resolved;
        }

        let mut table = write(table);
        // Another producer may have registered between the two locks
        if let Some(resolved) = lookup(&table, serial_number) {
            return resolved;
        }

        let channel = match kind {
            ChannelKind::Points => self.naming.synthesized_points(serial_number),
            ChannelKind::Status => self.naming.synthesized_status(serial_number),
        };
        table.insert(serial_number, channel.clone());

        counter!("cepton_router_routes_synthesized_total", "kind" => kind_label(kind))
            .increment(1);
        debug!(
            serial_number,
            kind = kind_label(kind),
            channel = %channel,
            "no default route, synthesized channel for unexpected sensor"
        );

        ResolvedChannel {
            channel,
            tier: RouteTier::Synthesized,
        }
    }

    /// Complete route for a serial number, if both channels are registered
    pub fn route(&self, serial_number: SerialNumber) -> Option<SensorRoute> {
        let point_channel = read(&self.point_channels).get(&serial_number).cloned()?;
        let status_channel = read(&self.status_channels).get(&serial_number).cloned()?;
        Some(SensorRoute {
            serial_number,
            frame_id: self.frame_id(serial_number),
            point_channel,
            status_channel,
        })
    }

    /// All complete routes, ordered by serial number
    pub fn routes(&self) -> Vec<SensorRoute> {
        self.serial_numbers()
            .into_iter()
            .filter_map(|serial_number| self.route(serial_number))
            .collect()
    }

    /// Serial numbers with at least one registered channel
    pub fn serial_numbers(&self) -> BTreeSet<SerialNumber> {
        read(&self.point_channels)
            .keys()
            .chain(read(&self.status_channels).keys())
            .copied()
            .collect()
    }

    pub fn contains(&self, kind: ChannelKind, serial_number: SerialNumber) -> bool {
        let table = match kind {
            ChannelKind::Points => &self.point_channels,
            ChannelKind::Status => &self.status_channels,
        };
        read(table).contains_key(&serial_number)
    }

    pub fn has_default(&self, kind: ChannelKind) -> bool {
        self.contains(kind, DEFAULT_SERIAL_NUMBER)
    }
}

fn lookup(
    table: &HashMap<SerialNumber, ChannelKey>,
    serial_number: SerialNumber,
) -> Option<ResolvedChannel> {
    if let Some(channel) = table.get(&serial_number) {
        return Some(ResolvedChannel {
            channel: channel.clone(),
            tier: RouteTier::Exact,
        });
    }
    table
        .get(&DEFAULT_SERIAL_NUMBER)
        .map(|channel| ResolvedChannel {
            channel: channel.clone(),
            tier: RouteTier::Default,
        })
}

fn kind_label(kind: ChannelKind) -> &'static str {
    match kind {
        ChannelKind::Points => "points",
        ChannelKind::Status => "status",
    }
}

// Tables hold plain data, so a poisoned lock is still consistent
fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
