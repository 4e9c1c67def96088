//! Constants used throughout the monitor

/// Host measured when none is given
pub const DEFAULT_TARGET_HOST: &str = "www.google.com";

/// Default UDP port of the echo reflector
pub const DEFAULT_ECHO_PORT: u16 = 7007;

/// Upper bound for the probe interval and the per-probe timeout (ms)
pub const MAX_PROBE_WAIT_MS: u64 = 60_000;

/// Fraction of the average RTT under which jitter is rated very good
pub const RELATIVE_JITTER_FACTOR: f64 = 0.15;

/// Absolute jitter upper bound for the "good" band (ms)
pub const GOOD_JITTER_MS: f64 = 30.0;

/// Absolute jitter upper bound for the "fair" band (ms)
pub const FAIR_JITTER_MS: f64 = 50.0;

/// Loss-to-received ratio upper bound for the "fair" band
pub const FAIR_LOSS_RATIO: f64 = 1.0;

/// Average RTT upper bounds (ms) for the RTT bands, best first
pub const RTT_BAND_LIMITS_MS: [f64; 5] = [50.0, 100.0, 150.0, 300.0, 400.0];

/// Progress line tick interval in milliseconds
pub const PROGRESS_TICK_INTERVAL_MS: u64 = 100;

/// Histogram lower bound in microseconds
pub const HISTOGRAM_LOW_BOUND_US: u64 = 1;

/// Histogram upper bound in microseconds (one minute)
pub const HISTOGRAM_HIGH_BOUND_US: u64 = 60_000_000;

/// Histogram significant digits for precision
pub const HISTOGRAM_SIGNIFICANT_DIGITS: u8 = 3;

/// Extra time granted to an in-flight round after cancellation, on top of
/// the round's own worst-case duration
pub const SHUTDOWN_GRACE_MS: u64 = 500;

/// Accepted values for `--log-level`
pub const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
