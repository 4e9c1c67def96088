use crate::monitor::error::{MonitorError, Result};
use crate::protocol::{ProbePacket, PACKET_SIZE};
use std::net::UdpSocket;
use std::time::Duration;
use tracing::{debug, warn};

/// Trait for network socket operations with probe packet abstraction
pub trait NetworkSocket: Send {
    /// Send a probe to the connected peer
    fn send_probe(&self, packet: &ProbePacket) -> Result<usize>;

    /// Receive the next echoed probe
    fn recv_probe(&mut self) -> Result<ProbePacket>;

    /// Set the read timeout for the socket
    fn set_timeout(&self, timeout: Duration) -> Result<()>;
}

/// UDP-based implementation of NetworkSocket
#[derive(Debug)]
pub struct UdpNetworkSocket {
    socket: UdpSocket,
}

impl UdpNetworkSocket {
    /// Bind to a local address
    pub fn bind(addr: &str) -> Result<Self> {
        debug!(addr = addr, "Binding UDP socket");
        let socket = UdpSocket::bind(addr).map_err(|e| {
            warn!(error = %e, "Failed to bind socket");
            MonitorError::Socket(format!("Failed to bind to {}: {}", addr, e))
        })?;
        Ok(Self { socket })
    }

    /// Connect to the echo reflector; resolves `addr` if it is a host name
    pub fn connect(&self, addr: &str) -> Result<()> {
        debug!(addr = addr, "Connecting UDP socket");
        self.socket.connect(addr).map_err(|e| {
            warn!(error = %e, "Failed to connect socket");
            MonitorError::Socket(format!("Failed to connect to {}: {}", addr, e))
        })?;
        Ok(())
    }

    /// Address of the connected peer, as text for reports
    pub fn peer(&self) -> Result<String> {
        let peer = self.socket.peer_addr()?;
        Ok(peer.to_string())
    }
}

impl NetworkSocket for UdpNetworkSocket {
    fn send_probe(&self, packet: &ProbePacket) -> Result<usize> {
        let buf = packet.encode();
        let bytes_sent = self.socket.send(&buf).map_err(|e| {
            warn!(error = %e, "Failed to send probe");
            MonitorError::Io(e)
        })?;
        debug!(
            bytes_sent = bytes_sent,
            sequence = packet.sequence.0,
            "Probe sent"
        );
        Ok(bytes_sent)
    }

    fn recv_probe(&mut self) -> Result<ProbePacket> {
        let mut buf = [0u8; PACKET_SIZE];
        let len = self.socket.recv(&mut buf).map_err(|e| {
            debug!(error = %e, "Failed to receive probe");
            MonitorError::Io(e)
        })?;
        let packet = ProbePacket::decode(&buf[..len])?;
        debug!(
            sequence = packet.sequence.0,
            bytes_received = len,
            "Echo received"
        );
        Ok(packet)
    }

    fn set_timeout(&self, timeout: Duration) -> Result<()> {
        debug!(timeout_ms = timeout.as_millis() as u64, "Setting socket timeout");
        self.socket.set_read_timeout(Some(timeout)).map_err(|e| {
            warn!(error = %e, "Failed to set timeout");
            MonitorError::Socket(format!("Failed to set timeout: {}", e))
        })?;
        Ok(())
    }
}


#[cfg(test)]
pub use tests::MockNetworkSocket;
