//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{error, info};

use contracts::{DeviceOptions, SinkConfig};
use device::{MockDeviceConfig, ReplayConfig};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::net::MulticastConfig;
use crate::pipeline::{DeviceSource, Pipeline, PipelineConfig};

/// Sink used when none is configured
const DEFAULT_SINK: &str = "log";

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    let config = build_config(args)?;

    info!(
        transforms = ?config.transforms_path,
        parent_frame_id = %config.parent_frame_id,
        frame_mode = ?config.device_options.frame_mode,
        network_disabled = config.device_options.network_disabled(),
        sinks = config.sinks.len(),
        "Configuration loaded"
    );

    let pipeline = Pipeline::new(config);

    info!("Starting pipeline...");
    let stats = pipeline
        .run(setup_shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        frames_published = stats.ingestion.frames_published,
        frames_dropped = stats.ingestion.frames_dropped,
        duration_secs = stats.duration.as_secs_f64(),
        fps = format!("{:.2}", stats.fps()),
        "Pipeline completed successfully"
    );
    stats.print_summary();

    info!("cepton router finished");
    Ok(())
}

fn build_config(args: &RunArgs) -> Result<PipelineConfig> {
    if !(args.capture_speed.is_finite() && args.capture_speed > 0.0) {
        return Err(CliError::invalid_argument(
            "capture-speed",
            format!("{} is not a positive multiplier", args.capture_speed),
        )
        .into());
    }
    if args.queue_capacity == 0 {
        return Err(CliError::invalid_argument("queue-capacity", "must be at least 1").into());
    }

    let sinks = sink_configs(&args.sinks, args.queue_capacity)?;

    let device_options = DeviceOptions::new(
        args.control_flags,
        args.frame_mode,
        args.capture_path.is_some(),
    );

    let source = match &args.capture_path {
        Some(path) => DeviceSource::Replay {
            path: path.clone(),
            config: ReplayConfig {
                speed_multiplier: args.capture_speed,
                loop_playback: args.capture_loop,
            },
        },
        None => {
            let mut mock = MockDeviceConfig::from_options(args.mock_sensors.clone(), &device_options);
            mock.max_frames = (args.max_frames > 0).then_some(args.max_frames);
            DeviceSource::Mock(mock)
        }
    };

    Ok(PipelineConfig {
        transforms_path: args.transforms.clone(),
        parent_frame_id: args.parent_frame_id.clone(),
        device_options,
        source,
        multicast: args.multi_ip.map(|group| MulticastConfig {
            group,
            interface: args.local_ip,
            port: args.port,
        }),
        sinks,
        event_capacity: args.event_capacity,
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    })
}

/// Parse `--sink` values, falling back to a log sink
fn sink_configs(specs: &[String], queue_capacity: usize) -> Result<Vec<SinkConfig>> {
    let default = [DEFAULT_SINK.to_string()];
    let specs = if specs.is_empty() { &default[..] } else { specs };

    specs
        .iter()
        .enumerate()
        .map(|(index, spec)| {
            router::parse_sink_spec(spec, index, queue_capacity)
                .map_err(CliError::from)
                .with_context(|| format!("Invalid --sink '{spec}'"))
        })
        .collect()
}

/// Resolves on Ctrl+C or SIGTERM
///
/// If a handler cannot be installed the error is logged and that signal is
/// never reported.
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::warn!("Received shutdown signal, stopping pipeline...");
}
