//! jitterscope - continuous round-trip latency and jitter monitor
//!
//! Repeatedly sends rounds of UDP echo probes to a reflector, derives the
//! jitter of each round as the mean absolute difference between consecutive
//! round-trip times, and rates jitter, packet loss and latency in
//! qualitative bands.

pub mod monitor;
pub mod protocol;
pub mod server;
