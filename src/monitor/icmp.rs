//! ICMP echo transport over raw sockets.
//!
//! Each echo request carries an encoded [`ProbePacket`] as its payload, so
//! replies are matched the same way as on the UDP transport. Opening the
//! socket needs root or `CAP_NET_RAW`.

use crate::monitor::error::{MonitorError, Result};
use crate::monitor::probe::{run_probe_round, Prober};
use crate::monitor::sample::{Round, Sample};
use crate::monitor::socket::NetworkSocket;
use crate::protocol::{ProbePacket, ProtocolError, ProtocolResult, PACKET_SIZE};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io::{self, ErrorKind, Read};
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, info, warn};

const ICMP_HEADER_LEN: usize = 8;

/// Echo request length: ICMP header plus probe payload
pub const ICMP_PACKET_LEN: usize = ICMP_HEADER_LEN + PACKET_SIZE;

/// Room for an IPv4 header with options in front of the reply
const RECV_BUFFER_LEN: usize = 60 + ICMP_PACKET_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcmpFamily {
    V4,
    V6,
}

impl IcmpFamily {
    pub fn of(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => IcmpFamily::V4,
            IpAddr::V6(_) => IcmpFamily::V6,
        }
    }

    fn request_type(self) -> u8 {
        match self {
            IcmpFamily::V4 => 8,
            IcmpFamily::V6 => 128,
        }
    }

    fn reply_type(self) -> u8 {
        match self {
            IcmpFamily::V4 => 0,
            IcmpFamily::V6 => 129,
        }
    }
}

/// RFC 1071 internet checksum
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = data
        .chunks(2)
        .map(|pair| {
            let high = u32::from(pair[0]) << 8;
            let low = pair.get(1).copied().map(u32::from).unwrap_or(0);
            high | low
        })
        .sum();
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

/// Build an echo request carrying `packet`.
///
/// The ICMP sequence field holds the low 16 bits of the probe sequence; the
/// full value travels in the payload. ICMPv6 checksums are filled in by the
/// kernel.
pub fn encode_echo_request(
    family: IcmpFamily,
    identifier: u16,
    packet: &ProbePacket,
) -> [u8; ICMP_PACKET_LEN] {
    let mut buf = [0u8; ICMP_PACKET_LEN];
    buf[0] = family.request_type();
    buf[4..6].copy_from_slice(&identifier.to_be_bytes());
    buf[6..8].copy_from_slice(&(packet.sequence.0 as u16).to_be_bytes());
    buf[ICMP_HEADER_LEN..].copy_from_slice(&packet.encode());

    if family == IcmpFamily::V4 {
        let sum = checksum(&buf);
        buf[2..4].copy_from_slice(&sum.to_be_bytes());
    }
    buf
}

/// Extract our probe from a datagram read off a raw ICMP socket.
///
/// IPv4 raw sockets deliver the IP header too; IPv6 ones do not. Anything
/// that is not an echo reply to `identifier` is rejected.
pub fn decode_echo_reply(
    family: IcmpFamily,
    identifier: u16,
    datagram: &[u8],
) -> ProtocolResult<ProbePacket> {
    let icmp = match family {
        IcmpFamily::V4 => {
            let header_len = datagram.first().map(|b| usize::from(b & 0x0f) * 4).unwrap_or(0);
            datagram.get(header_len..).unwrap_or_default()
        }
        IcmpFamily::V6 => datagram,
    };

    if icmp.len() < ICMP_HEADER_LEN {
        return Err(ProtocolError::InvalidPacketSize {
            expected: ICMP_PACKET_LEN,
            actual: icmp.len(),
        });
    }
    if icmp[0] != family.reply_type() {
        return Err(ProtocolError::UnexpectedIcmpType(icmp[0]));
    }
    let actual = u16::from_be_bytes([icmp[4], icmp[5]]);
    if actual != identifier {
        return Err(ProtocolError::ForeignIdentifier {
            expected: identifier,
            actual,
        });
    }
    ProbePacket::decode(&icmp[ICMP_HEADER_LEN..])
}

/// Classify a socket setup failure; a refused raw socket is a privilege
/// problem, not a network one.
pub fn socket_error(e: io::Error, action: &str) -> MonitorError {
    if e.kind() == ErrorKind::PermissionDenied {
        MonitorError::Privilege(format!(
            "cannot {}: {} (run as root or grant CAP_NET_RAW, or use --transport udp)",
            action, e
        ))
    } else {
        MonitorError::Socket(format!("Failed to {}: {}", action, e))
    }
}

/// Raw ICMP socket connected to a single peer
#[derive(Debug)]
pub struct IcmpSocket {
    socket: Socket,
    family: IcmpFamily,
    identifier: u16,
    buf: [u8; RECV_BUFFER_LEN],
}

impl IcmpSocket {
    pub fn open(peer: IpAddr, identifier: u16) -> Result<Self> {
        let family = IcmpFamily::of(peer);
        let (domain, protocol) = match family {
            IcmpFamily::V4 => (Domain::IPV4, Protocol::ICMPV4),
            IcmpFamily::V6 => (Domain::IPV6, Protocol::ICMPV6),
        };

        let socket = Socket::new(domain, Type::RAW, Some(protocol)).map_err(|e| {
            warn!(error = %e, "Failed to open raw ICMP socket");
            socket_error(e, "open a raw ICMP socket")
        })?;
        socket
            .connect(&SockAddr::from(SocketAddr::new(peer, 0)))
            .map_err(|e| socket_error(e, &format!("connect to {}", peer)))?;
        debug!(peer = %peer, identifier = identifier, "Raw ICMP socket ready");

        Ok(Self {
            socket,
            family,
            identifier,
            buf: [0u8; RECV_BUFFER_LEN],
        })
    }
}

impl NetworkSocket for IcmpSocket {
    fn send_probe(&self, packet: &ProbePacket) -> Result<usize> {
        let request = encode_echo_request(self.family, self.identifier, packet);
        let bytes_sent = self.socket.send(&request).map_err(|e| {
            warn!(error = %e, "Failed to send echo request");
            MonitorError::Io(e)
        })?;
        debug!(sequence = packet.sequence.0, bytes_sent = bytes_sent, "Echo request sent");
        Ok(bytes_sent)
    }

    fn recv_probe(&mut self) -> Result<ProbePacket> {
        let len = self.socket.read(&mut self.buf)?;
        Ok(decode_echo_reply(self.family, self.identifier, &self.buf[..len])?)
    }

    fn set_timeout(&self, timeout: Duration) -> Result<()> {
        self.socket
            .set_read_timeout(Some(timeout))
            .map_err(|e| MonitorError::Socket(format!("Failed to set timeout: {}", e)))
    }
}

/// Privileged ICMP echo transport, able to measure any host.
///
/// Every round uses a fresh socket and identifier, so late replies to an
/// earlier round are never taken for current ones.
#[derive(Debug, Clone)]
pub struct IcmpEchoProber {
    timeout: Duration,
    interval: Duration,
    identifier: u16,
}

impl IcmpEchoProber {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            interval,
            identifier: std::process::id() as u16,
        }
    }

    fn resolve(host: &str) -> Result<IpAddr> {
        (host, 0)
            .to_socket_addrs()
            .map_err(|e| MonitorError::Probe(format!("cannot resolve {}: {}", host, e)))?
            .next()
            .map(|addr| addr.ip())
            .ok_or_else(|| MonitorError::Probe(format!("no address found for {}", host)))
    }
}

impl Prober for IcmpEchoProber {
    fn probe_round(
        &mut self,
        target: &str,
        count: usize,
        on_sample: &mut dyn FnMut(&Sample),
    ) -> Result<Round> {
        let peer = Self::resolve(target)?;
        self.identifier = self.identifier.wrapping_add(1);
        let mut socket = IcmpSocket::open(peer, self.identifier)?;

        info!(addr = target, peer = %peer, count = count, "Starting ICMP probe round");
        run_probe_round(
            &mut socket,
            &peer.to_string(),
            count,
            self.interval,
            self.timeout,
            on_sample,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SequenceNumber;
    use std::net::Ipv4Addr;

    fn reply_from(request: &[u8; ICMP_PACKET_LEN]) -> Vec<u8> {
        // minimal IPv4 header (IHL = 5) in front of the echoed message
        let mut datagram = vec![0x45u8];
        datagram.extend_from_slice(&[0u8; 19]);
        datagram.extend_from_slice(request);
        datagram[20] = 0;
        datagram
    }

    #[test]
    fn test_echo_request_layout() {
        let packet = ProbePacket::new(SequenceNumber(0x1_0002), 99);
        let request = encode_echo_request(IcmpFamily::V4, 0xbeef, &packet);

        assert_eq!(request[0], 8);
        assert_eq!(request[1], 0);
        assert_eq!(&request[4..6], &[0xbe, 0xef]);
        assert_eq!(&request[6..8], &[0x00, 0x02]);
        assert_eq!(&request[ICMP_HEADER_LEN..], &packet.encode());
        // a correct checksum makes the whole message sum to zero
        assert_eq!(checksum(&request), 0);
    }

    #[test]
    fn test_checksum_odd_length() {
        assert_eq!(checksum(&[0x01]), !0x0100);
        assert_eq!(checksum(&[]), 0xffff);
    }

    #[test]
    fn test_icmpv6_request_leaves_checksum_to_kernel() {
        let packet = ProbePacket::new(SequenceNumber(1), 0);
        let request = encode_echo_request(IcmpFamily::V6, 7, &packet);

        assert_eq!(request[0], 128);
        assert_eq!(&request[2..4], &[0, 0]);
    }

    #[test]
    fn test_decode_ipv4_reply() {
        let packet = ProbePacket::new(SequenceNumber(5), 1234);
        let datagram = reply_from(&encode_echo_request(IcmpFamily::V4, 42, &packet));

        assert_eq!(decode_echo_reply(IcmpFamily::V4, 42, &datagram), Ok(packet));
    }

    #[test]
    fn test_decode_ipv6_reply() {
        let packet = ProbePacket::new(SequenceNumber(9), 0);
        let mut message = encode_echo_request(IcmpFamily::V6, 42, &packet);
        message[0] = 129;

        assert_eq!(decode_echo_reply(IcmpFamily::V6, 42, &message), Ok(packet));
    }

    #[test]
    fn test_decode_rejects_own_request_and_foreign_replies() {
        let packet = ProbePacket::new(SequenceNumber(5), 0);
        let request = encode_echo_request(IcmpFamily::V4, 42, &packet);

        let mut looped_back = reply_from(&request);
        looped_back[20] = 8;
        assert_eq!(
            decode_echo_reply(IcmpFamily::V4, 42, &looped_back),
            Err(ProtocolError::UnexpectedIcmpType(8))
        );

        let foreign = reply_from(&request);
        assert_eq!(
            decode_echo_reply(IcmpFamily::V4, 41, &foreign),
            Err(ProtocolError::ForeignIdentifier {
                expected: 41,
                actual: 42
            })
        );
    }

    #[test]
    fn test_decode_truncated_datagram() {
        assert!(matches!(
            decode_echo_reply(IcmpFamily::V4, 1, &[0x45, 0, 0]),
            Err(ProtocolError::InvalidPacketSize { .. })
        ));
        assert!(matches!(
            decode_echo_reply(IcmpFamily::V6, 1, &[]),
            Err(ProtocolError::InvalidPacketSize { actual: 0, .. })
        ));
    }

    #[test]
    fn test_permission_denied_is_privilege_error() {
        let err = socket_error(
            io::Error::from(ErrorKind::PermissionDenied),
            "open a raw ICMP socket",
        );
        assert!(matches!(err, MonitorError::Privilege(_)));
        assert!(err.to_string().starts_with("Insufficient privilege"));

        let err = socket_error(io::Error::from(ErrorKind::AddrNotAvailable), "connect");
        assert!(matches!(err, MonitorError::Socket(_)));
    }

    #[test]
    fn test_open_needs_privilege_or_succeeds() {
        match IcmpSocket::open(IpAddr::V4(Ipv4Addr::LOCALHOST), 1) {
            Ok(socket) => assert_eq!(socket.family, IcmpFamily::V4),
            Err(e) => assert!(matches!(e, MonitorError::Privilege(_)), "{}", e),
        }
    }

    #[test]
    fn test_prober_rejects_unresolvable_host() {
        let mut prober = IcmpEchoProber::new(Duration::from_millis(10), Duration::ZERO);
        let result = prober.probe_round("no-such-host.invalid", 1, &mut |_| {});
        assert!(matches!(result, Err(MonitorError::Probe(_))));
    }

    #[test]
    fn test_failed_resolution_keeps_identifier() {
        let mut prober = IcmpEchoProber::new(Duration::from_millis(10), Duration::ZERO);
        let first = prober.identifier;
        let _ = prober.probe_round("no-such-host.invalid", 1, &mut |_| {});
        assert_eq!(prober.identifier, first);
    }
}
