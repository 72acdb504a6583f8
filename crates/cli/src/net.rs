//! Multicast group membership for live sensors.

use std::net::{Ipv4Addr, SocketAddrV4};

use tokio::net::UdpSocket;
use tracing::{debug, info};

use crate::error::{CliError, Result};

/// Where sensor traffic is received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MulticastConfig {
    pub group: Ipv4Addr,
    pub interface: Ipv4Addr,
    pub port: u16,
}

/// Bind `0.0.0.0:<port>` and join the group on the given interface
///
/// The returned socket holds the membership; dropping it leaves the group.
pub async fn join_multicast(config: MulticastConfig) -> Result<UdpSocket> {
    let join_error =
        |source| CliError::multicast_join(config.group, config.interface, config.port, source);

    if !config.group.is_multicast() {
        return Err(join_error(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "not a multicast address",
        )));
    }

    let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, config.port))
        .await
        .map_err(join_error)?;
    debug!(port = config.port, "multicast socket bound");

    socket
        .join_multicast_v4(config.group, config.interface)
        .map_err(join_error)?;

    info!(
        group = %config.group,
        interface = %config.interface,
        port = config.port,
        "joined multicast group"
    );
    Ok(socket)
}
