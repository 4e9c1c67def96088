//! UDP echo loop with lock-free packet counters

use crate::monitor::cancel::CancelToken;
use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// How often the receive loop wakes up to look for cancellation
const CANCEL_POLL_INTERVAL_MS: u64 = 100;

/// Largest datagram echoed back in full
const MAX_DATAGRAM: usize = 1500;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("Network I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Counters shared between the echo loop and whoever reports on it.
///
/// `Relaxed` ordering is enough for independent monotonic counters.
#[derive(Debug, Clone, Default)]
pub struct ServerCounters {
    packets_received: Arc<AtomicU64>,
    packets_sent: Arc<AtomicU64>,
    errors: Arc<AtomicU64>,
}

impl ServerCounters {
    #[inline]
    pub fn increment_received(&self) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_sent(&self) {
        self.packets_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self, elapsed: Duration) -> ServerStats {
        ServerStats {
            packets_received: self.packets_received.load(Ordering::Relaxed),
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            elapsed,
        }
    }
}

/// Final server statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStats {
    pub packets_received: u64,
    pub packets_sent: u64,
    pub errors: u64,
    pub elapsed: Duration,
}

/// Reflects every datagram back to its sender unchanged
pub struct EchoServer {
    socket: UdpSocket,
    counters: ServerCounters,
    start_time: Instant,
}

impl EchoServer {
    pub fn bind(addr: impl ToSocketAddrs + std::fmt::Display) -> Result<Self, ServerError> {
        let socket = UdpSocket::bind(&addr).map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        socket.set_read_timeout(Some(Duration::from_millis(CANCEL_POLL_INTERVAL_MS)))?;

        Ok(Self {
            socket,
            counters: ServerCounters::default(),
            start_time: Instant::now(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.socket.local_addr()?)
    }

    pub fn counters(&self) -> ServerCounters {
        self.counters.clone()
    }

    pub fn stats(&self) -> ServerStats {
        self.counters.snapshot(self.start_time.elapsed())
    }

    /// Echo datagrams until `cancel` fires.
    ///
    /// Per-datagram failures are counted and logged, never fatal.
    pub fn serve(&self, cancel: &CancelToken) -> Result<ServerStats, ServerError> {
        info!(address = %self.local_addr()?, "Echo server listening");
        let mut buf = [0u8; MAX_DATAGRAM];

        while !cancel.is_cancelled() {
            let (len, peer) = match self.socket.recv_from(&mut buf) {
                Ok(received) => received,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    continue;
                }
                Err(e) => {
                    self.counters.increment_error();
                    warn!(error = %e, "Failed to receive datagram");
                    continue;
                }
            };
            self.counters.increment_received();

            match self.socket.send_to(&buf[..len], peer) {
                Ok(_) => {
                    self.counters.increment_sent();
                    debug!(peer = %peer, bytes = len, "Echoed datagram");
                }
                Err(e) => {
                    self.counters.increment_error();
                    warn!(error = %e, peer = %peer, "Failed to echo datagram");
                }
            }
        }

        let stats = self.stats();
        info!(
            received = stats.packets_received,
            sent = stats.packets_sent,
            errors = stats.errors,
            "Echo server stopped"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::cancel::cancel_pair;
    use std::thread;

    #[test]
    fn test_counters() {
        let counters = ServerCounters::default();
        let shared = counters.clone();

        shared.increment_received();
        shared.increment_sent();
        shared.increment_error();

        let stats = counters.snapshot(Duration::ZERO);
        assert_eq!(stats.packets_received, 1);
        assert_eq!(stats.packets_sent, 1);
        assert_eq!(stats.errors, 1);
    }

    #[test]
    fn test_bind_error_names_address() {
        let err = EchoServer::bind("256.0.0.1:7007").err().unwrap();
        assert!(err.to_string().contains("256.0.0.1:7007"));
    }

    #[test]
    fn test_echoes_and_stops_on_cancel() -> Result<(), ServerError> {
        let server = EchoServer::bind("127.0.0.1:0")?;
        let addr = server.local_addr()?;
        let (handle, token) = cancel_pair();
        let worker = thread::spawn(move || server.serve(&token));

        let client = UdpSocket::bind("127.0.0.1:0")?;
        client.set_read_timeout(Some(Duration::from_secs(2)))?;
        client.send_to(b"ping-payload", addr)?;
        let mut buf = [0u8; 64];
        let (len, _) = client.recv_from(&mut buf)?;
        assert_eq!(&buf[..len], b"ping-payload");

        handle.cancel();
        let stats = worker.join().unwrap()?;
        assert_eq!(stats.packets_received, 1);
        assert_eq!(stats.packets_sent, 1);
        Ok(())
    }
}
