//! LogSink - logs a one-line summary per message via tracing

use contracts::{ContractError, DataSink, MessageBody, OutboundMessage};
use tracing::{info, instrument};

/// Sink that logs message summaries for debugging
pub struct LogSink {
    name: String,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_summary(&self, message: &OutboundMessage) {
        match &message.body {
            MessageBody::PointCloud(cloud) => info!(
                sink = %self.name,
                seq = message.seq,
                channel = %message.channel,
                frame_id = %cloud.frame_id,
                stamp = cloud.stamp,
                points = cloud.width,
                "point cloud"
            ),
            MessageBody::Status(status) => info!(
                sink = %self.name,
                seq = message.seq,
                channel = %message.channel,
                serial_number = status.serial_number,
                model = %status.model_name,
                temperature = status.last_reported_temperature,
                "sensor status"
            ),
            MessageBody::Transform(transform) => info!(
                sink = %self.name,
                seq = message.seq,
                channel = %message.channel,
                parent = %transform.frame_id,
                child = %transform.child_frame_id,
                "static transform"
            ),
        }
    }
}

impl DataSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, message),
        fields(sink = %self.name, seq = message.seq)
    )]
    async fn write(&mut self, message: &OutboundMessage) -> Result<(), ContractError> {
        self.log_summary(message);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{SensorStatusMessage, StaticTransform};

    #[tokio::test]
    async fn test_log_sink_write() {
        let mut sink = LogSink::new("test_log");
        let status = OutboundMessage {
            seq: 1,
            channel: "cepton/sensor_information".into(),
            body: MessageBody::Status(SensorStatusMessage::default()),
        };
        let transform = OutboundMessage {
            seq: 2,
            channel: "/tf_static".into(),
            body: MessageBody::Transform(StaticTransform {
                frame_id: "cepton".to_string(),
                child_frame_id: "cepton_0".to_string(),
                translation: [0.0; 3],
                rotation: Default::default(),
            }),
        };

        assert!(sink.write(&status).await.is_ok());
        assert!(sink.write(&transform).await.is_ok());
        assert_eq!(sink.name(), "test_log");
    }
}
