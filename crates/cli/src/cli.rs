//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::Ipv4Addr;
use std::path::PathBuf;

use contracts::{FrameMode, SerialNumber};

/// Cepton Router - routes LiDAR frames from each sensor to its own channels
#[derive(Parser, Debug)]
#[command(
    name = "cepton-router",
    author,
    version,
    about = "Cepton LiDAR point-cloud routing driver",
    long_about = "Receives completed frames from a Cepton device (live, capture replay or \n\
                  simulated), routes each sensor to its configured point and status \n\
                  channels, and publishes static sensor transforms to the configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "CEPTON_ROUTER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "CEPTON_ROUTER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the driver
    Run(RunArgs),

    /// Validate a transforms file without running
    Validate(ValidateArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Sensor transforms file (JSON, or TOML by extension); omit for the default route
    #[arg(short, long, env = "CEPTON_ROUTER_TRANSFORMS")]
    pub transforms: Option<PathBuf>,

    /// Parent frame of every sensor transform
    #[arg(long, default_value = "cepton", env = "CEPTON_ROUTER_PARENT_FRAME_ID")]
    pub parent_frame_id: String,

    /// Multicast group to join
    #[arg(long, env = "CEPTON_ROUTER_MULTI_IP")]
    pub multi_ip: Option<Ipv4Addr>,

    /// Local interface address used for the multicast join
    #[arg(long, default_value = "0.0.0.0", env = "CEPTON_ROUTER_LOCAL_IP")]
    pub local_ip: Ipv4Addr,

    /// UDP port bound for the multicast join
    #[arg(long, default_value = "0", env = "CEPTON_ROUTER_PORT")]
    pub port: u16,

    /// Capture file to replay instead of listening to sensors
    #[arg(long, env = "CEPTON_ROUTER_CAPTURE_PATH")]
    pub capture_path: Option<PathBuf>,

    /// Restart the capture when it ends
    #[arg(
        long,
        default_value_t = true,
        action = clap::ArgAction::Set,
        env = "CEPTON_ROUTER_CAPTURE_LOOP"
    )]
    pub capture_loop: bool,

    /// Capture playback speed multiplier
    #[arg(long, default_value = "1.0", env = "CEPTON_ROUTER_CAPTURE_SPEED")]
    pub capture_speed: f64,

    /// Device control flags (bitwise OR)
    #[arg(long, default_value = "0", env = "CEPTON_ROUTER_CONTROL_FLAGS")]
    pub control_flags: u32,

    /// Frame grouping: COVER, CYCLE or STREAMING
    #[arg(long, default_value = "CYCLE", env = "CEPTON_ROUTER_FRAME_MODE")]
    pub frame_mode: FrameMode,

    /// Output sink: log, file:<dir> or udp:<addr>[:json|bincode] (repeatable)
    #[arg(long = "sink", value_name = "SPEC", env = "CEPTON_ROUTER_SINKS", value_delimiter = ',')]
    pub sinks: Vec<String>,

    /// Per-sink queue capacity
    #[arg(long, default_value = "100", env = "CEPTON_ROUTER_QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    /// Capacity of the device event queue
    #[arg(long, default_value = "64", env = "CEPTON_ROUTER_EVENT_CAPACITY")]
    pub event_capacity: usize,

    /// Serial numbers of the simulated device used when no capture is given
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "0",
        env = "CEPTON_ROUTER_MOCK_SENSORS"
    )]
    pub mock_sensors: Vec<SerialNumber>,

    /// Stop after this many frames per simulated sensor (0 = unlimited)
    #[arg(long, default_value = "0", env = "CEPTON_ROUTER_MAX_FRAMES")]
    pub max_frames: u64,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "CEPTON_ROUTER_TIMEOUT")]
    pub timeout: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "CEPTON_ROUTER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Transforms file to validate
    #[arg(short, long)]
    pub transforms: PathBuf,

    /// Parent frame used for the reported transforms
    #[arg(long, default_value = "cepton")]
    pub parent_frame_id: String,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
