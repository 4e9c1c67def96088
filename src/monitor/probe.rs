//! Probe rounds: the echo transports behind the monitor loop

use crate::monitor::error::{MonitorError, Result};
use crate::monitor::icmp::IcmpEchoProber;
use crate::monitor::sample::{Round, Sample};
use crate::monitor::socket::{NetworkSocket, UdpNetworkSocket};
use crate::protocol::{ProbePacket, SequenceNumber};
use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Produces one round of RTT samples against a target.
///
/// `on_sample` is invoked once per reply, in arrival order, before the
/// round is returned. An `Err` means no round could be produced at all.
pub trait Prober {
    fn probe_round(
        &mut self,
        target: &str,
        count: usize,
        on_sample: &mut dyn FnMut(&Sample),
    ) -> Result<Round>;
}

/// Send one probe and wait for its echo.
///
/// Returns `Ok(None)` when no matching echo arrives within `timeout` of the
/// send. Echoes of earlier probes that straggle in late are discarded, and
/// so is anything that does not decode as an echo of ours; neither extends
/// the wait.
pub fn measure_single_probe<S: NetworkSocket>(
    socket: &mut S,
    sequence: SequenceNumber,
    round_start: Instant,
    timeout: Duration,
) -> Result<Option<Duration>> {
    let t1 = Instant::now();
    let packet = ProbePacket::new(sequence, t1.duration_since(round_start).as_nanos() as u64);
    socket.send_probe(&packet)?;

    loop {
        let remaining = timeout.saturating_sub(t1.elapsed());
        if remaining.is_zero() {
            debug!(sequence = sequence.0, "Echo deadline passed");
            return Ok(None);
        }
        socket.set_timeout(remaining)?;

        match socket.recv_probe() {
            Ok(echo) if echo.sequence == sequence => {
                let rtt = t1.elapsed();
                debug!(sequence = sequence.0, rtt_us = rtt.as_micros() as u64, "Echo matched");
                return Ok(Some(rtt));
            }
            Ok(echo) if echo.sequence < sequence => {
                debug!(
                    expected = sequence.0,
                    received = echo.sequence.0,
                    "Discarding stale echo"
                );
            }
            Ok(echo) => {
                warn!(
                    expected = sequence.0,
                    received = echo.sequence.0,
                    "Echo from the future, counting probe as lost"
                );
                return Ok(None);
            }
            Err(MonitorError::Protocol(e)) => {
                debug!(error = %e, "Ignoring unrelated datagram");
            }
            Err(MonitorError::Io(e))
                if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) =>
            {
                debug!(sequence = sequence.0, "Echo timed out");
                return Ok(None);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Run `count` probes over an already connected socket.
///
/// Probes are spaced `interval` apart, measured from send to send; each
/// waits at most `timeout` for its echo.
pub fn run_probe_round<S: NetworkSocket>(
    socket: &mut S,
    target: &str,
    count: usize,
    interval: Duration,
    timeout: Duration,
    on_sample: &mut dyn FnMut(&Sample),
) -> Result<Round> {
    let mut samples = Vec::with_capacity(count);
    let mut lost = 0usize;
    let start = Instant::now();

    for i in 0..count {
        let due = interval
            .checked_mul(u32::try_from(i).unwrap_or(u32::MAX))
            .and_then(|offset| start.checked_add(offset));
        if let Some(due) = due {
            let wait = due.saturating_duration_since(Instant::now());
            if !wait.is_zero() {
                thread::sleep(wait);
            }
        }

        let sequence = SequenceNumber(i as u64);
        match measure_single_probe(socket, sequence, start, timeout) {
            Ok(Some(rtt)) => {
                let sample = Sample::new(sequence.0, rtt);
                on_sample(&sample);
                samples.push(sample);
            }
            Ok(None) => {
                lost += 1;
                warn!(probe = i + 1, addr = target, "Probe lost or timed out");
            }
            Err(e) => {
                return Err(MonitorError::Probe(format!(
                    "round against {} interrupted after {} probes ({} answered, {} lost): {}",
                    target,
                    samples.len() + lost,
                    samples.len(),
                    lost,
                    e
                )));
            }
        }
    }

    debug!(
        addr = target,
        received = samples.len(),
        lost = lost,
        "Probe round completed"
    );
    Ok(Round::new(target, samples, count))
}

/// UDP echo transport, answered by the bundled reflector.
///
/// Opens a fresh socket for every round, like a ping client started anew
/// per measurement. Needs no privilege.
#[derive(Debug, Clone)]
pub struct UdpEchoProber {
    timeout: Duration,
    interval: Duration,
}

impl UdpEchoProber {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    fn resolve(target: &str) -> Result<SocketAddr> {
        target
            .to_socket_addrs()
            .map_err(|e| MonitorError::Probe(format!("cannot resolve {}: {}", target, e)))?
            .next()
            .ok_or_else(|| MonitorError::Probe(format!("no address found for {}", target)))
    }
}

impl Prober for UdpEchoProber {
    fn probe_round(
        &mut self,
        target: &str,
        count: usize,
        on_sample: &mut dyn FnMut(&Sample),
    ) -> Result<Round> {
        let addr = Self::resolve(target)?;
        let local = if addr.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" };

        let mut socket = UdpNetworkSocket::bind(local)?;
        socket.connect(&addr.to_string())?;

        let peer = socket.peer()?;
        info!(addr = target, peer = %peer, count = count, "Starting probe round");
        run_probe_round(&mut socket, &peer, count, self.interval, self.timeout, on_sample)
    }
}

/// The transport picked on the command line
#[derive(Debug, Clone)]
pub enum EchoProber {
    Icmp(IcmpEchoProber),
    Udp(UdpEchoProber),
}

impl Prober for EchoProber {
    fn probe_round(
        &mut self,
        target: &str,
        count: usize,
        on_sample: &mut dyn FnMut(&Sample),
    ) -> Result<Round> {
        match self {
            EchoProber::Icmp(prober) => prober.probe_round(target, count, on_sample),
            EchoProber::Udp(prober) => prober.probe_round(target, count, on_sample),
        }
    }
}
