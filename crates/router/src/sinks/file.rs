//! FileSink - writes messages to disk, one directory per channel
//!
//! Layout under `base_path`:
//! - `<channel>/<seq>.ply` for point clouds (binary little-endian PLY)
//! - `<channel>/<seq>.json` for status and transform messages
//!
//! Channel names are flattened into directory names (`cepton/points` becomes
//! `cepton_points`).

use contracts::{ContractError, DataSink, MessageBody, OutboundMessage, PointCloudMessage};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, instrument};

#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Base output directory
    pub base_path: PathBuf,
}

impl FileSinkConfig {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output"));

        Self { base_path }
    }
}

/// Sink that writes messages to disk files
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    created_dirs: HashSet<PathBuf>,
}

impl FileSink {
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        fs::create_dir_all(&config.base_path)?;

        Ok(Self {
            name: name.into(),
            config,
            created_dirs: HashSet::new(),
        })
    }

    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        Self::new(name, FileSinkConfig::from_params(params))
    }

    fn channel_dir(&mut self, channel: &str) -> std::io::Result<PathBuf> {
        let dir = self.config.base_path.join(channel_dir_name(channel));
        if !self.created_dirs.contains(&dir) {
            fs::create_dir_all(&dir)?;
            self.created_dirs.insert(dir.clone());
        }
        Ok(dir)
    }

    fn write_message_to_disk(&mut self, message: &OutboundMessage) -> std::io::Result<()> {
        let dir = self.channel_dir(&message.channel)?;

        match &message.body {
            MessageBody::PointCloud(cloud) => {
                save_point_cloud(&dir.join(format!("{}.ply", message.seq)), cloud)
            }
            MessageBody::Status(_) | MessageBody::Transform(_) => {
                let file = File::create(dir.join(format!("{}.json", message.seq)))?;
                serde_json::to_writer_pretty(BufWriter::new(file), &message.body)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
            }
        }
    }

    fn persist(&mut self, message: &OutboundMessage) -> Result<(), ContractError> {
        self.write_message_to_disk(message).map_err(|e| {
            error!(sink = %self.name, seq = message.seq, error = %e, "write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }
}

fn channel_dir_name(channel: &str) -> String {
    let name: String = channel
        .trim_matches('/')
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.is_empty() {
        "_".to_string()
    } else {
        name
    }
}

fn save_point_cloud(path: &Path, cloud: &PointCloudMessage) -> std::io::Result<()> {
    let points = cloud.points().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "point payload is not a whole number of records",
        )
    })?;

    let mut file = BufWriter::new(File::create(path)?);
    writeln!(file, "ply")?;
    writeln!(file, "format binary_little_endian 1.0")?;
    writeln!(file, "comment frame_id {}", cloud.frame_id)?;
    writeln!(file, "element vertex {}", points.len())?;
    writeln!(file, "property float x")?;
    writeln!(file, "property float y")?;
    writeln!(file, "property float z")?;
    writeln!(file, "property float intensity")?;
    writeln!(file, "end_header")?;

    for point in &points {
        for value in [point.x, point.y, point.z, point.intensity] {
            file.write_all(&value.to_le_bytes())?;
        }
    }
    file.flush()
}

impl DataSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, message),
        fields(sink = %self.name, seq = message.seq)
    )]
    async fn write(&mut self, message: &OutboundMessage) -> Result<(), ContractError> {
        self.persist(message)
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(sink = %self.name, "FileSink closed");
        Ok(())
    }
}
