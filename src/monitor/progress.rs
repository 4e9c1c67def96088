use crate::monitor::constants::PROGRESS_TICK_INTERVAL_MS;
use crate::monitor::error::{MonitorError, Result};
use crate::monitor::jitter::JitterResult;
use crate::monitor::sample::Sample;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Live progress line for the round in flight, showing the running jitter.
///
/// Draws to stderr, so it never mixes into the report stream.
pub struct RoundProgress {
    pb: ProgressBar,
}

impl RoundProgress {
    pub fn new(probe_count: usize) -> Result<Self> {
        let pb = ProgressBar::new(probe_count as u64);
        pb.set_style(
            ProgressStyle::with_template("{spinner} {bar:30.cyan/blue} {pos:>3}/{len:3} {msg}")
                .map_err(|e| {
                    MonitorError::Output(format!("Failed to create progress style: {}", e))
                })?
                .progress_chars("█░"),
        );
        pb.enable_steady_tick(Duration::from_millis(PROGRESS_TICK_INTERVAL_MS));
        Ok(Self { pb })
    }

    /// A progress line that draws nothing, for quiet and JSON modes
    pub fn hidden() -> Self {
        Self {
            pb: ProgressBar::hidden(),
        }
    }

    /// Advance by one answered probe and refresh the running figures
    pub fn record(&self, sample: &Sample, jitter: &JitterResult) {
        self.pb.inc(1);

        let jitter_str = match jitter.value_ms() {
            Some(value) => format!("{:.2}ms", value),
            None => "--".to_string(),
        };
        self.pb.set_message(format!(
            "→ {}ms  jitter: {}",
            format!("{:.2}", sample.rtt_ms()).bold(),
            jitter_str.cyan()
        ));
    }

    pub fn position(&self) -> u64 {
        self.pb.position()
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}
