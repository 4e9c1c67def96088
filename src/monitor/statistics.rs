use crate::monitor::constants::*;
use crate::monitor::error::{MonitorError, Result};
use crate::monitor::sample::Round;
use hdrhistogram::Histogram;
use tracing::{debug, warn};

/// RTT distribution of one round, backed by an HDR histogram in microseconds
pub struct RttDistribution {
    hist: Histogram<u64>,
    clamped_count: usize,
}

impl RttDistribution {
    pub fn from_round(round: &Round) -> Result<Self> {
        let mut hist = Histogram::<u64>::new_with_bounds(
            HISTOGRAM_LOW_BOUND_US,
            HISTOGRAM_HIGH_BOUND_US,
            HISTOGRAM_SIGNIFICANT_DIGITS,
        )
        .map_err(|e| MonitorError::Output(format!("Failed to create histogram: {}", e)))?;

        let mut clamped_count = 0;
        for sample in round.samples() {
            let rtt_us = sample.rtt.as_micros() as u64;
            let clamped = rtt_us.clamp(HISTOGRAM_LOW_BOUND_US, HISTOGRAM_HIGH_BOUND_US);
            if clamped != rtt_us {
                clamped_count += 1;
            }

            hist.record(clamped).map_err(|e| {
                warn!(rtt_us = rtt_us, error = %e, "Failed to record RTT");
                MonitorError::Output(format!("Failed to record RTT: {}", e))
            })?;
        }

        if clamped_count > 0 {
            warn!(
                clamped_count = clamped_count,
                total_count = round.received(),
                "Some RTT values were clamped to histogram bounds"
            );
        }
        debug!(samples = hist.len(), "RTT distribution built");

        Ok(Self {
            hist,
            clamped_count,
        })
    }

    /// RTT at `quantile` in milliseconds, `None` for an empty round
    pub fn percentile_ms(&self, quantile: f64) -> Option<f64> {
        if self.hist.len() == 0 {
            return None;
        }
        Some(self.hist.value_at_quantile(quantile) as f64 / 1000.0)
    }

    pub fn median_ms(&self) -> Option<f64> {
        self.percentile_ms(0.5)
    }

    pub fn clamped_count(&self) -> usize {
        self.clamped_count
    }

    pub fn count(&self) -> u64 {
        self.hist.len()
    }
}
