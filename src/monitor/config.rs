use crate::monitor::constants::{
    DEFAULT_ECHO_PORT, DEFAULT_TARGET_HOST, MAX_PROBE_WAIT_MS, SHUTDOWN_GRACE_MS, VALID_LOG_LEVELS,
};
use crate::monitor::error::{MonitorError, Result};
use crate::monitor::icmp::IcmpEchoProber;
use crate::monitor::logging::is_valid_log_level;
use crate::monitor::probe::{EchoProber, UdpEchoProber};
use crate::monitor::reporter::OutputFormat;
use crate::monitor::runner::MonitorSettings;
use clap::{Parser, ValueEnum};
use std::time::Duration;
use tracing::debug;

/// How probes reach the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    /// ICMP echo over a raw socket; any host, needs root or CAP_NET_RAW
    Icmp,
    /// UDP to a jitterscope echo-server; no privilege needed
    Udp,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "jitterscope")]
#[command(about = "Continuous round-trip latency and jitter monitor")]
pub struct MonitorConfig {
    /// Host to measure
    #[arg(long, default_value = DEFAULT_TARGET_HOST)]
    pub host: String,

    /// Probe transport
    #[arg(long, value_enum, default_value_t = Transport::Icmp)]
    pub transport: Transport,

    /// UDP port of the echo reflector (udp transport only)
    #[arg(long, default_value_t = DEFAULT_ECHO_PORT)]
    pub port: u16,

    /// Number of probes per measurement round
    #[arg(short = 'c', long, default_value_t = 10)]
    pub count: usize,

    /// Pause between measurement rounds in seconds
    #[arg(long, default_value_t = 5)]
    pub pause_secs: u64,

    /// Spacing between probes within a round in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub interval_ms: u64,

    /// Time to wait for each echo before counting the probe as lost
    #[arg(long, default_value_t = 1000)]
    pub timeout_ms: u64,

    /// Show a line for every reply as it arrives
    #[arg(short = 'l', long)]
    pub list: bool,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Disable the live progress line
    #[arg(long)]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Log format (text or json)
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub log_format: String,
}

impl MonitorConfig {
    /// What the prober is pointed at: a bare host for ICMP, `host:port`
    /// for UDP
    pub fn target(&self) -> String {
        let host = self.host.trim_matches(['[', ']']);
        match self.transport {
            Transport::Icmp => host.to_string(),
            Transport::Udp if host.contains(':') => format!("[{}]:{}", host, self.port),
            Transport::Udp => format!("{}:{}", host, self.port),
        }
    }

    pub fn prober(&self) -> EchoProber {
        match self.transport {
            Transport::Icmp => EchoProber::Icmp(IcmpEchoProber::new(self.timeout(), self.interval())),
            Transport::Udp => EchoProber::Udp(UdpEchoProber::new(self.timeout(), self.interval())),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn pause(&self) -> Duration {
        Duration::from_secs(self.pause_secs)
    }

    /// Upper bound for letting an in-flight round finish after cancellation
    pub fn shutdown_grace(&self) -> Duration {
        let per_probe = self.interval().max(self.timeout());
        let probes = u32::try_from(self.count).unwrap_or(u32::MAX);
        per_probe
            .saturating_mul(probes)
            .saturating_add(Duration::from_millis(SHUTDOWN_GRACE_MS))
    }

    pub fn is_json_format(&self) -> bool {
        self.log_format.to_lowercase() == "json"
    }

    pub fn settings(&self) -> MonitorSettings {
        MonitorSettings {
            target: self.target(),
            count: self.count,
            pause: self.pause(),
            list_replies: self.list,
            live_progress: !self.quiet && self.output == OutputFormat::Text,
        }
    }

    /// Validates the configuration values
    pub fn validate(&self) -> Result<()> {
        debug!("Validating configuration");
        if self.host.trim().is_empty() {
            return Err(MonitorError::Config("host must not be empty".into()));
        }
        if self.transport == Transport::Udp && self.port == 0 {
            return Err(MonitorError::Config("port must be > 0".into()));
        }
        if self.count == 0 {
            return Err(MonitorError::Config("count must be > 0".into()));
        }
        if u32::try_from(self.count).is_err() {
            return Err(MonitorError::Config("count is too large".into()));
        }
        if self.timeout_ms == 0 {
            return Err(MonitorError::Config("timeout must be > 0".into()));
        }
        if self.timeout_ms > MAX_PROBE_WAIT_MS || self.interval_ms > MAX_PROBE_WAIT_MS {
            return Err(MonitorError::Config(format!(
                "interval and timeout must not exceed {}ms",
                MAX_PROBE_WAIT_MS
            )));
        }
        if self.pause_secs == 0 {
            return Err(MonitorError::Config("pause must be > 0".into()));
        }
        if !is_valid_log_level(&self.log_level) {
            return Err(MonitorError::Config(format!(
                "log_level must be one of: {}",
                VALID_LOG_LEVELS.join(", ")
            )));
        }
        debug!("Configuration validated successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> MonitorConfig {
        MonitorConfig::parse_from(["jitterscope"])
    }

    #[test]
    fn test_default_config() {
        let config = base();

        assert_eq!(config.transport, Transport::Icmp);
        assert_eq!(config.target(), "www.google.com");
        assert_eq!(config.count, 10);
        assert_eq!(config.pause(), Duration::from_secs(5));
        assert_eq!(config.output, OutputFormat::Text);
        assert!(matches!(config.prober(), EchoProber::Icmp(_)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_short_flags() {
        let config = MonitorConfig::parse_from(["jitterscope", "-c", "3", "-l", "--host", "example.net"]);

        assert_eq!(config.count, 3);
        assert!(config.list);
        assert_eq!(config.target(), "example.net");
    }

    #[test]
    fn test_udp_transport_targets_reflector_port() {
        let config = MonitorConfig::parse_from([
            "jitterscope",
            "--transport",
            "udp",
            "--host",
            "127.0.0.1",
        ]);

        assert_eq!(config.target(), "127.0.0.1:7007");
        assert!(matches!(config.prober(), EchoProber::Udp(_)));
    }

    #[test]
    fn test_ipv6_host() {
        let udp = MonitorConfig::parse_from([
            "jitterscope",
            "--transport",
            "udp",
            "--host",
            "::1",
            "--port",
            "9000",
        ]);
        assert_eq!(udp.target(), "[::1]:9000");

        let icmp = MonitorConfig::parse_from(["jitterscope", "--host", "[::1]"]);
        assert_eq!(icmp.target(), "::1");
    }

    #[test]
    fn test_invalid_values() {
        let mut config = base();
        config.count = 0;
        assert!(config.validate().is_err());

        let mut config = base();
        config.timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = base();
        config.pause_secs = 0;
        assert!(config.validate().is_err());

        let mut config = base();
        config.log_level = "loud".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_port_only_matters_for_udp() {
        let icmp = MonitorConfig::parse_from(["jitterscope", "--port", "0"]);
        assert!(icmp.validate().is_ok());

        let udp = MonitorConfig::parse_from(["jitterscope", "--transport", "udp", "--port", "0"]);
        assert!(udp.validate().is_err());
    }

    #[test]
    fn test_huge_interval_is_rejected() {
        let config = MonitorConfig::parse_from([
            "jitterscope",
            "-c",
            "5000",
            "--interval-ms",
            "18446744073709551615",
        ]);
        assert!(matches!(config.validate(), Err(MonitorError::Config(_))));

        let config = MonitorConfig::parse_from(["jitterscope", "--timeout-ms", "60001"]);
        assert!(config.validate().is_err());

        let config = MonitorConfig::parse_from(["jitterscope", "--interval-ms", "60000"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_shutdown_grace_saturates() {
        let mut config = base();
        config.count = 5000;
        config.interval_ms = u64::MAX;

        assert_eq!(config.shutdown_grace(), Duration::MAX);
    }

    #[test]
    fn test_settings_disable_progress_for_json() {
        let config = MonitorConfig::parse_from(["jitterscope", "--output", "json"]);
        let settings = config.settings();

        assert!(!settings.live_progress);
        assert_eq!(settings.count, 10);
        assert_eq!(settings.target, "www.google.com");
    }

    #[test]
    fn test_shutdown_grace_covers_a_round() {
        let config = MonitorConfig::parse_from(["jitterscope", "-c", "4", "--interval-ms", "200"]);
        // timeout (1000ms) dominates the 200ms interval
        assert_eq!(config.shutdown_grace(), Duration::from_millis(4 * 1000 + 500));
    }
}
