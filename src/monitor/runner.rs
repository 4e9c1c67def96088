//! The continuous monitoring loop

use crate::monitor::cancel::CancelToken;
use crate::monitor::error::Result;
use crate::monitor::jitter::{JitterAccumulator, JitterResult};
use crate::monitor::probe::Prober;
use crate::monitor::progress::RoundProgress;
use crate::monitor::quality::Scores;
use crate::monitor::reporter::{Reporter, RoundReport};
use crate::monitor::sample::Sample;
use crate::monitor::statistics::RttDistribution;
use std::io::Write;
use std::time::Duration;
use tracing::{debug, error, info};

/// Loop parameters, independent of how they were configured
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// `host:port` handed to the prober
    pub target: String,
    /// Probes per round
    pub count: usize,
    /// Suspension between the end of one round and the start of the next
    pub pause: Duration,
    /// Write a line for every reply as it arrives
    pub list_replies: bool,
    /// Draw the live progress line while a round is in flight
    pub live_progress: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Running,
    Stopped,
}

/// Runs probe rounds back to back until cancelled.
///
/// A failed round ends the loop with its error; there is no retry.
pub struct Monitor<P, W> {
    prober: P,
    out: W,
    reporter: Reporter,
    settings: MonitorSettings,
    rounds: u64,
    state: MonitorState,
}

impl<P: Prober, W: Write> Monitor<P, W> {
    pub fn new(prober: P, out: W, reporter: Reporter, settings: MonitorSettings) -> Self {
        Self {
            prober,
            out,
            reporter,
            settings,
            rounds: 0,
            state: MonitorState::Running,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Rounds completed so far
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Loop until `cancel` fires or a round fails.
    ///
    /// Cancellation is observed before each round and during the pause; a
    /// round already in flight runs to completion. Returns the number of
    /// rounds completed.
    pub fn run(&mut self, cancel: &CancelToken) -> Result<u64> {
        info!(
            addr = %self.settings.target,
            count = self.settings.count,
            pause_ms = self.settings.pause.as_millis() as u64,
            "Monitor started"
        );
        self.reporter
            .write_banner(&mut self.out, &self.settings.target, self.settings.count)?;

        let outcome = self.cycle(cancel);
        self.state = MonitorState::Stopped;

        match &outcome {
            Ok(rounds) => info!(rounds = *rounds, "Monitor stopped"),
            Err(e) => error!(error = %e, rounds = self.rounds, "Monitor failed"),
        }
        outcome
    }

    fn cycle(&mut self, cancel: &CancelToken) -> Result<u64> {
        loop {
            if cancel.is_cancelled() {
                break;
            }

            self.run_round()?;

            if cancel.wait_timeout(self.settings.pause) {
                debug!("Cancellation observed during pause");
                break;
            }
        }
        Ok(self.rounds)
    }

    /// Probe, compute, classify and report a single round
    pub fn run_round(&mut self) -> Result<()> {
        let index = self.rounds + 1;
        let count = self.settings.count;
        let list_replies = self.settings.list_replies;
        let reporter = self.reporter;

        let progress = if self.settings.live_progress {
            RoundProgress::new(count)?
        } else {
            RoundProgress::hidden()
        };

        let mut acc = JitterAccumulator::new();
        let mut reply_error = None;
        let outcome = {
            let out = &mut self.out;
            let target = self.settings.target.as_str();
            let mut on_sample = |sample: &Sample| {
                acc.push(sample.rtt);
                progress.record(sample, &acc.current());

                if list_replies && reply_error.is_none() {
                    if let Err(e) = reporter.write_reply(&mut *out, target, sample) {
                        reply_error = Some(e);
                    }
                }
            };
            self.prober.probe_round(target, count, &mut on_sample)
        };
        progress.finish();

        let round = outcome?;
        if let Some(e) = reply_error {
            return Err(e);
        }

        let jitter = acc.current();
        debug_assert_eq!(jitter, JitterResult::from_round(&round));

        let scores = Scores::for_round(&round, &jitter);
        let distribution = RttDistribution::from_round(&round)?;
        let report = RoundReport {
            index,
            round: &round,
            jitter,
            scores,
            median_ms: distribution.median_ms(),
            p90_ms: distribution.percentile_ms(0.9),
        };
        self.reporter.write_round(&mut self.out, &report)?;

        self.rounds = index;
        Ok(())
    }
}
