//! NetworkSink - UDP fire-and-forget streaming of outbound messages

use contracts::{ContractError, DataSink, OutboundMessage};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, error, instrument, warn};

/// Serialization format for network transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkFormat {
    /// JSON (human-readable, larger)
    #[default]
    Json,
    /// Bincode (binary, compact)
    Bincode,
}

#[derive(Debug, Clone)]
pub struct NetworkSinkConfig {
    pub addr: SocketAddr,
    pub format: NetworkFormat,
    /// Largest datagram sent; bigger messages are skipped
    pub max_packet_size: usize,
}

impl NetworkSinkConfig {
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let addr_str = params
            .get("addr")
            .ok_or_else(|| "missing 'addr' parameter".to_string())?;

        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|e| format!("invalid address '{}': {}", addr_str, e))?;

        let format = match params.get("format").map(String::as_str) {
            Some("bincode") => NetworkFormat::Bincode,
            Some("json") | None => NetworkFormat::Json,
            Some(other) => return Err(format!("unknown format '{}'", other)),
        };

        let max_packet_size = params
            .get("max_packet_size")
            .and_then(|s| s.parse().ok())
            .unwrap_or(65000);

        Ok(Self {
            addr,
            format,
            max_packet_size,
        })
    }
}

/// Sink that sends each message as one UDP datagram
pub struct NetworkSink {
    name: String,
    config: NetworkSinkConfig,
    socket: Option<UdpSocket>,
}

impl NetworkSink {
    #[instrument(name = "network_sink_new", skip(name, config), fields(target = %config.addr))]
    pub async fn new(name: impl Into<String>, config: NetworkSinkConfig) -> std::io::Result<Self> {
        let name = name.into();
        let bind_addr = if config.addr.is_ipv6() {
            "[::]:0"
        } else {
            "0.0.0.0:0"
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(&config.addr).await?;

        debug!(sink = %name, target = %config.addr, "NetworkSink connected");

        Ok(Self {
            name,
            config,
            socket: Some(socket),
        })
    }

    #[instrument(name = "network_sink_from_params", skip(name, params))]
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = NetworkSinkConfig::from_params(params)
            .map_err(|e| ContractError::sink_write(&name, e))?;

        Self::new(name.clone(), config)
            .await
            .map_err(|e| ContractError::SinkConnection {
                sink_name: name,
                message: e.to_string(),
            })
    }

    fn serialize(&self, message: &OutboundMessage) -> Result<Vec<u8>, ContractError> {
        match self.config.format {
            NetworkFormat::Json => serde_json::to_vec(message)
                .map_err(|e| ContractError::sink_write(&self.name, format!("json error: {e}"))),
            NetworkFormat::Bincode => bincode::serialize(message)
                .map_err(|e| ContractError::sink_write(&self.name, format!("bincode error: {e}"))),
        }
    }
}

impl DataSink for NetworkSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "network_sink_write",
        skip(self, message),
        fields(sink = %self.name, seq = message.seq)
    )]
    async fn write(&mut self, message: &OutboundMessage) -> Result<(), ContractError> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| ContractError::sink_write(&self.name, "socket not connected"))?;
        let data = self.serialize(message)?;

        if data.len() > self.config.max_packet_size {
            warn!(
                sink = %self.name,
                channel = %message.channel,
                size = data.len(),
                max = self.config.max_packet_size,
                "message exceeds datagram limit, skipped"
            );
            return Ok(());
        }

        match socket.send(&data).await {
            Ok(sent) => debug!(sink = %self.name, bytes = sent, "sent"),
            // UDP is best-effort
            Err(e) => error!(sink = %self.name, error = %e, "UDP send failed"),
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "network_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.socket = None;
        debug!(sink = %self.name, "NetworkSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{MessageBody, Quaternion, StaticTransform};

    fn transform_message() -> OutboundMessage {
        OutboundMessage {
            seq: 3,
            channel: "/tf_static".into(),
            body: MessageBody::Transform(StaticTransform {
                frame_id: "cepton".to_string(),
                child_frame_id: "cepton_5".to_string(),
                translation: [1.0, 2.0, 3.0],
                rotation: Quaternion::IDENTITY,
            }),
        }
    }

    #[test]
    fn test_network_sink_config_parsing() {
        let mut params = HashMap::new();
        params.insert("addr".to_string(), "127.0.0.1:9999".to_string());
        params.insert("format".to_string(), "bincode".to_string());

        let config = NetworkSinkConfig::from_params(&params).unwrap();
        assert_eq!(config.addr.port(), 9999);
        assert_eq!(config.format, NetworkFormat::Bincode);

        params.insert("format".to_string(), "xml".to_string());
        assert!(NetworkSinkConfig::from_params(&params).is_err());
    }

    #[tokio::test]
    async fn test_network_sink_delivers_datagram() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let config = NetworkSinkConfig {
            addr: receiver.local_addr().unwrap(),
            format: NetworkFormat::Bincode,
            max_packet_size: 65000,
        };

        let mut sink = NetworkSink::new("test_net", config).await.unwrap();
        let message = transform_message();
        sink.write(&message).await.unwrap();

        let mut buf = vec![0u8; 65536];
        let len = receiver.recv(&mut buf).await.unwrap();
        let decoded: OutboundMessage = bincode::deserialize(&buf[..len]).unwrap();
        assert_eq!(decoded, message);

        sink.close().await.unwrap();
        assert!(sink.write(&message).await.is_err());
    }

    #[tokio::test]
    async fn test_network_sink_json_without_receiver() {
        let config = NetworkSinkConfig {
            addr: "127.0.0.1:19998".parse().unwrap(),
            format: NetworkFormat::Json,
            max_packet_size: 65000,
        };

        let mut sink = NetworkSink::new("test_net", config).await.unwrap();
        assert!(sink.write(&transform_message()).await.is_ok());
    }
}
