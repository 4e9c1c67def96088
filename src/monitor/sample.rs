//! Samples and rounds as handed over by a [`Prober`](crate::monitor::Prober)

use std::time::Duration;

/// Converts a duration to fractional milliseconds.
///
/// Works from whole nanoseconds so that durations made of whole
/// milliseconds convert without rounding error.
pub fn duration_ms(duration: Duration) -> f64 {
    duration.as_nanos() as f64 / 1_000_000.0
}

/// One round-trip measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Ordinal position of the probe within its round
    pub seq: u64,
    pub rtt: Duration,
}

impl Sample {
    pub fn new(seq: u64, rtt: Duration) -> Self {
        Self { seq, rtt }
    }

    pub fn rtt_ms(&self) -> f64 {
        duration_ms(self.rtt)
    }
}

/// The outcome of one batch of echo probes.
///
/// Counters are derived once at construction; a round never changes after
/// the prober returns it.
#[derive(Debug, Clone, PartialEq)]
pub struct Round {
    target: String,
    samples: Vec<Sample>,
    sent: usize,
    min: Option<Duration>,
    max: Option<Duration>,
    avg: Option<Duration>,
}

impl Round {
    /// Build a round from the replies that came back for `sent` probes.
    ///
    /// Samples are kept in the order given, which must be arrival order.
    pub fn new(target: impl Into<String>, samples: Vec<Sample>, sent: usize) -> Self {
        let min = samples.iter().map(|s| s.rtt).min();
        let max = samples.iter().map(|s| s.rtt).max();
        let avg = if samples.is_empty() {
            None
        } else {
            let total: u128 = samples.iter().map(|s| s.rtt.as_nanos()).sum();
            let mean = total / samples.len() as u128;
            Some(Duration::from_nanos(mean as u64))
        };

        Self {
            target: target.into(),
            samples,
            sent,
            min,
            max,
            avg,
        }
    }

    /// Convenience constructor from bare RTTs; every probe is assumed answered.
    pub fn from_rtts(target: impl Into<String>, rtts: &[Duration]) -> Self {
        let samples = rtts
            .iter()
            .enumerate()
            .map(|(i, &rtt)| Sample::new(i as u64, rtt))
            .collect();
        Self::new(target, samples, rtts.len())
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn sent(&self) -> usize {
        self.sent
    }

    pub fn received(&self) -> usize {
        self.samples.len()
    }

    pub fn lost(&self) -> usize {
        self.sent.saturating_sub(self.samples.len())
    }

    /// Lost probes as a percentage of sent probes
    pub fn loss_percent(&self) -> f64 {
        if self.sent == 0 {
            0.0
        } else {
            self.lost() as f64 / self.sent as f64 * 100.0
        }
    }

    pub fn min_rtt(&self) -> Option<Duration> {
        self.min
    }

    pub fn max_rtt(&self) -> Option<Duration> {
        self.max
    }

    pub fn avg_rtt(&self) -> Option<Duration> {
        self.avg
    }

    /// Average RTT in milliseconds, `None` when nothing came back
    pub fn avg_rtt_ms(&self) -> Option<f64> {
        self.avg.map(duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_duration_ms_whole_millis_exact() {
        assert_eq!(duration_ms(ms(110)), 110.0);
        assert_eq!(duration_ms(Duration::from_micros(1500)), 1.5);
    }

    #[test]
    fn test_round_counters() {
        let round = Round::new(
            "127.0.0.1:7007",
            vec![Sample::new(0, ms(100)), Sample::new(2, ms(120))],
            3,
        );

        assert_eq!(round.sent(), 3);
        assert_eq!(round.received(), 2);
        assert_eq!(round.lost(), 1);
        assert_eq!(round.min_rtt(), Some(ms(100)));
        assert_eq!(round.max_rtt(), Some(ms(120)));
        assert_eq!(round.avg_rtt(), Some(ms(110)));
        assert_eq!(round.avg_rtt_ms(), Some(110.0));
    }

    #[test]
    fn test_empty_round_has_no_rtt_figures() {
        let round = Round::new("10.0.0.1:7007", Vec::new(), 4);

        assert_eq!(round.received(), 0);
        assert_eq!(round.lost(), 4);
        assert_eq!(round.loss_percent(), 100.0);
        assert!(round.min_rtt().is_none());
        assert!(round.max_rtt().is_none());
        assert!(round.avg_rtt_ms().is_none());
    }

    #[test]
    fn test_from_rtts_preserves_order() {
        let round = Round::from_rtts("h", &[ms(3), ms(1), ms(2)]);
        let seqs: Vec<u64> = round.samples().iter().map(|s| s.seq).collect();
        let rtts: Vec<f64> = round.samples().iter().map(Sample::rtt_ms).collect();

        assert_eq!(seqs, vec![0, 1, 2]);
        assert_eq!(rtts, vec![3.0, 1.0, 2.0]);
        assert_eq!(round.lost(), 0);
    }
}
