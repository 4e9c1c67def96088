//! Jitter as the mean absolute difference between consecutive RTTs.
//!
//! The same [`JitterAccumulator`] backs both the live, per-sample estimate
//! and the after-the-fact computation over a finished [`Round`], so the two
//! always produce identical bits for identical input.

use crate::monitor::sample::{duration_ms, Round};
use std::time::Duration;

/// Jitter of one round
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JitterResult {
    /// At least two samples were available
    Measured {
        jitter_ms: f64,
        /// Number of successive differences that went into the mean
        intervals: usize,
    },
    /// Fewer than two samples; jitter is undefined
    Insufficient { samples: usize },
}

impl JitterResult {
    /// Batch computation over a finished round
    pub fn from_round(round: &Round) -> Self {
        jitter_of(round.samples().iter().map(|s| s.rtt))
    }

    /// The jitter in milliseconds, if defined
    pub fn value_ms(&self) -> Option<f64> {
        match *self {
            JitterResult::Measured { jitter_ms, .. } => Some(jitter_ms),
            JitterResult::Insufficient { .. } => None,
        }
    }

    pub fn is_measured(&self) -> bool {
        matches!(self, JitterResult::Measured { .. })
    }
}

/// Running state for the streaming estimate.
///
/// The first pushed RTT only seeds `previous_ms`; every later one adds
/// its absolute difference to the previous RTT.
#[derive(Debug, Clone, Default)]
pub struct JitterAccumulator {
    previous_ms: Option<f64>,
    accumulated_abs_diff_ms: f64,
    measurement_count: usize,
}

impl JitterAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next RTT in arrival order
    pub fn push(&mut self, rtt: Duration) {
        self.push_ms(duration_ms(rtt));
    }

    /// Feed the next RTT, already expressed in milliseconds
    pub fn push_ms(&mut self, rtt_ms: f64) {
        if let Some(previous) = self.previous_ms {
            self.accumulated_abs_diff_ms += (rtt_ms - previous).abs();
            self.measurement_count += 1;
        }
        self.previous_ms = Some(rtt_ms);
    }

    /// Number of RTTs pushed so far
    pub fn samples(&self) -> usize {
        match self.previous_ms {
            Some(_) => self.measurement_count + 1,
            None => 0,
        }
    }

    /// Estimate after the samples seen so far
    pub fn current(&self) -> JitterResult {
        if self.measurement_count == 0 {
            return JitterResult::Insufficient {
                samples: self.samples(),
            };
        }
        JitterResult::Measured {
            jitter_ms: self.accumulated_abs_diff_ms / self.measurement_count as f64,
            intervals: self.measurement_count,
        }
    }
}

/// Batch jitter over RTTs in arrival order
pub fn jitter_of<I>(rtts: I) -> JitterResult
where
    I: IntoIterator<Item = Duration>,
{
    let mut acc = JitterAccumulator::new();
    for rtt in rtts {
        acc.push(rtt);
    }
    acc.current()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(values: &[u64]) -> Vec<Duration> {
        values.iter().map(|&v| Duration::from_millis(v)).collect()
    }

    #[test]
    fn test_constant_rtt_has_zero_jitter() {
        let result = jitter_of(ms(&[42, 42, 42, 42, 42]));
        assert_eq!(result.value_ms(), Some(0.0));
    }

    #[test]
    fn test_alternating_rtt_jitter_equals_step() {
        let result = jitter_of(ms(&[20, 27, 20, 27, 20, 27]));
        assert_eq!(
            result,
            JitterResult::Measured {
                jitter_ms: 7.0,
                intervals: 5
            }
        );
    }

    #[test]
    fn test_reference_round() {
        // diffs 10, 20, 10
        let result = jitter_of(ms(&[100, 110, 90, 100]));
        let jitter = result.value_ms().unwrap();
        assert!((jitter - 40.0 / 3.0).abs() < 1e-12);
        assert_eq!(format!("{:.2}", jitter), "13.33");
    }

    #[test]
    fn test_empty_round_is_insufficient() {
        let result = jitter_of(Vec::new());
        assert_eq!(result, JitterResult::Insufficient { samples: 0 });
        assert!(result.value_ms().is_none());
    }

    #[test]
    fn test_single_sample_is_insufficient_not_zero() {
        let result = jitter_of(ms(&[15]));
        assert_eq!(result, JitterResult::Insufficient { samples: 1 });
        assert!(!result.is_measured());
    }

    #[test]
    fn test_streaming_estimate_after_each_sample() {
        let mut acc = JitterAccumulator::new();
        assert_eq!(acc.current(), JitterResult::Insufficient { samples: 0 });

        acc.push(Duration::from_millis(100));
        assert_eq!(acc.current(), JitterResult::Insufficient { samples: 1 });

        acc.push(Duration::from_millis(110));
        assert_eq!(acc.current().value_ms(), Some(10.0));

        acc.push(Duration::from_millis(90));
        assert_eq!(acc.current().value_ms(), Some(15.0));
        assert_eq!(acc.samples(), 3);
    }

    #[test]
    fn test_from_round_matches_streaming() {
        let rtts = ms(&[31, 45, 12, 80, 80, 3]);
        let round = Round::from_rtts("127.0.0.1:7007", &rtts);

        let mut acc = JitterAccumulator::new();
        for rtt in &rtts {
            acc.push(*rtt);
        }

        assert_eq!(JitterResult::from_round(&round), acc.current());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_streaming_and_batch_agree(micros in prop::collection::vec(0u64..5_000_000, 2..128)) {
            let rtts: Vec<Duration> = micros.iter().map(|&us| Duration::from_micros(us)).collect();

            let mut acc = JitterAccumulator::new();
            for rtt in &rtts {
                acc.push(*rtt);
            }
            let streamed = acc.current().value_ms().unwrap();
            let batch = jitter_of(rtts.iter().copied()).value_ms().unwrap();

            prop_assert_eq!(streamed.to_bits(), batch.to_bits());
            prop_assert!(streamed.is_finite() && streamed >= 0.0);
        }

        #[test]
        fn test_alternating_sequence_yields_step(base in 0u64..1_000, step in 0u64..500, n in 2usize..64) {
            let rtts: Vec<Duration> = (0..n)
                .map(|i| Duration::from_millis(if i % 2 == 0 { base } else { base + step }))
                .collect();

            prop_assert_eq!(jitter_of(rtts).value_ms(), Some(step as f64));
        }

        #[test]
        fn test_constant_sequence_yields_zero(rtt in 0u64..10_000, n in 2usize..64) {
            let rtts = vec![Duration::from_millis(rtt); n];
            prop_assert_eq!(jitter_of(rtts).value_ms(), Some(0.0));
        }
    }
}
