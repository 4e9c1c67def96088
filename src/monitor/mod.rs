//! Measuring side: probe rounds, jitter, quality bands and the monitor loop

pub mod cancel;
pub mod config;
pub mod constants;
pub mod error;
pub mod icmp;
pub mod jitter;
pub mod logging;
pub mod probe;
pub mod progress;
pub mod quality;
pub mod reporter;
pub mod runner;
pub mod sample;
pub mod socket;
pub mod statistics;

pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use config::{MonitorConfig, Transport};
pub use constants::*;
pub use error::{MonitorError, Result};
pub use jitter::{jitter_of, JitterAccumulator, JitterResult};
pub use logging::{init_logging_with_config, is_valid_log_level};
pub use icmp::{IcmpEchoProber, IcmpSocket};
pub use probe::{measure_single_probe, run_probe_round, EchoProber, Prober, UdpEchoProber};
pub use progress::RoundProgress;
pub use quality::{
    classify_jitter, classify_loss, classify_rtt, relative_jitter_threshold, JitterScore,
    LossScore, RttScore, Scores, Tone,
};
pub use reporter::{OutputFormat, Reporter, RoundRecord, RoundReport};
pub use runner::{Monitor, MonitorSettings, MonitorState};
pub use sample::{duration_ms, Round, Sample};
pub use socket::{NetworkSocket, UdpNetworkSocket};
pub use statistics::RttDistribution;
