//! Sink construction from configuration

use std::collections::HashMap;

use contracts::{SinkConfig, SinkType};
use tracing::instrument;

use crate::error::RouterError;
use crate::handle::SinkHandle;
use crate::sinks::{FileSink, LogSink, NetworkSink};

/// Create a running SinkHandle from configuration
#[instrument(
    name = "router_create_sink_handle",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
pub async fn create_sink_handle(config: &SinkConfig) -> Result<SinkHandle, RouterError> {
    match config.sink_type {
        SinkType::Log => {
            let sink = LogSink::new(&config.name);
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params)
                .map_err(|e| RouterError::sink_creation(&config.name, e.to_string()))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
        SinkType::Network => {
            let sink = NetworkSink::from_params(&config.name, &config.params)
                .await
                .map_err(|e| RouterError::sink_creation(&config.name, e.to_string()))?;
            Ok(SinkHandle::spawn(sink, config.queue_capacity))
        }
    }
}

/// Parse a command-line sink spec
///
/// Accepted forms: `log`, `file:<dir>`, `udp:<host>:<port>` and
/// `udp:<host>:<port>:<json|bincode>`.
pub fn parse_sink_spec(
    spec: &str,
    index: usize,
    queue_capacity: usize,
) -> Result<SinkConfig, RouterError> {
    let (kind, rest) = match spec.split_once(':') {
        Some((kind, rest)) => (kind, Some(rest)),
        None => (spec, None),
    };

    let mut params = HashMap::new();
    let sink_type = match (kind, rest) {
        ("log", None) => SinkType::Log,
        ("file", Some(dir)) if !dir.is_empty() => {
            params.insert("base_path".to_string(), dir.to_string());
            SinkType::File
        }
        ("udp", Some(target)) => {
            let (addr, format) = match target.rsplit_once(':') {
                Some((addr, format @ ("json" | "bincode"))) => (addr, Some(format)),
                _ => (target, None),
            };
            if addr.is_empty() {
                return Err(RouterError::invalid_sink_spec(spec, "missing address"));
            }
            params.insert("addr".to_string(), addr.to_string());
            if let Some(format) = format {
                params.insert("format".to_string(), format.to_string());
            }
            SinkType::Network
        }
        _ => {
            return Err(RouterError::invalid_sink_spec(
                spec,
                "expected log, file:<dir> or udp:<addr>[:json|bincode]",
            ))
        }
    };

    Ok(SinkConfig {
        name: format!("{kind}_{index}"),
        sink_type,
        queue_capacity,
        params,
    })
}
