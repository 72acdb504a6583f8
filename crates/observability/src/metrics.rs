//! Router metric names, descriptions and run statistics
//!
//! Counters are emitted with the `metrics` macros where the event happens
//! (router, ingestion). This module describes them once for the exporter and
//! provides the gauges and in-memory statistics used by the CLI.

use metrics::{describe_counter, describe_gauge, gauge, Unit};

pub const FRAMES_PUBLISHED: &str = "cepton_router_frames_published_total";
pub const POINTS_PUBLISHED: &str = "cepton_router_points_published_total";
pub const FRAMES_DROPPED: &str = "cepton_router_frames_dropped_total";
pub const STATUS_FAILURES: &str = "cepton_router_status_failures_total";
pub const PUBLISH_FAILURES: &str = "cepton_router_publish_failures_total";
pub const ROUTES_SYNTHESIZED: &str = "cepton_router_routes_synthesized_total";
pub const QUEUE_DROPPED: &str = "cepton_router_queue_dropped_total";
pub const ROUTES: &str = "cepton_router_routes";
pub const EVENT_QUEUE_LEN: &str = "cepton_router_event_queue_len";
pub const SINK_QUEUE_LEN: &str = "cepton_router_sink_queue_len";

/// Register descriptions for every router metric
pub fn describe_metrics() {
    describe_counter!(FRAMES_PUBLISHED, Unit::Count, "Point frames handed to sinks");
    describe_counter!(POINTS_PUBLISHED, Unit::Count, "Points handed to sinks");
    describe_counter!(
        FRAMES_DROPPED,
        Unit::Count,
        "Device frames dropped because the event queue was full"
    );
    describe_counter!(STATUS_FAILURES, Unit::Count, "Failed sensor status queries");
    describe_counter!(PUBLISH_FAILURES, Unit::Count, "Publications refused by every sink");
    describe_counter!(
        ROUTES_SYNTHESIZED,
        Unit::Count,
        "Channels created at runtime for unexpected sensors"
    );
    describe_counter!(QUEUE_DROPPED, Unit::Count, "Messages refused by a sink queue, by sink and message kind");
    describe_gauge!(ROUTES, Unit::Count, "Sensors with a registered route");
    describe_gauge!(EVENT_QUEUE_LEN, Unit::Count, "Pending device frame events");
    describe_gauge!(SINK_QUEUE_LEN, Unit::Count, "Pending messages per sink");
}

pub fn record_route_count(routes: usize) {
    gauge!(ROUTES).set(routes as f64);
}

pub fn record_event_queue_len(len: usize) {
    gauge!(EVENT_QUEUE_LEN).set(len as f64);
}

pub fn record_sink_queue_len(sink: &str, len: usize) {
    gauge!(SINK_QUEUE_LEN, "sink" => sink.to_string()).set(len as f64);
}

/// Min/max/mean summary of a `RunningStats`
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.1}, std={:.1} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online mean/variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
