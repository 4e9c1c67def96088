//! Qualitative bands for jitter, packet loss and latency.
//!
//! Every classifier checks its bands from best to worst and returns on the
//! first upper bound that holds, so boundary values land in the better band.

use crate::monitor::constants::*;
use crate::monitor::jitter::JitterResult;
use crate::monitor::sample::Round;
use serde::Serialize;

/// Presentation hint attached to every band.
///
/// Only the reporter turns tones into colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Positive,
    Neutral,
    Caution,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterScore {
    VeryGood,
    Good,
    Fair,
    Bad,
}

impl JitterScore {
    pub fn label(self) -> &'static str {
        match self {
            JitterScore::VeryGood => "very good",
            JitterScore::Good => "good",
            JitterScore::Fair => "fair",
            JitterScore::Bad => "bad",
        }
    }

    pub fn tone(self) -> Tone {
        match self {
            JitterScore::VeryGood | JitterScore::Good => Tone::Positive,
            JitterScore::Fair => Tone::Caution,
            JitterScore::Bad => Tone::Negative,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LossScore {
    Good,
    Fair,
    Bad,
}

impl LossScore {
    pub fn label(self) -> &'static str {
        match self {
            LossScore::Good => "good",
            LossScore::Fair => "fair",
            LossScore::Bad => "bad",
        }
    }

    pub fn tone(self) -> Tone {
        match self {
            LossScore::Good => Tone::Positive,
            LossScore::Fair => Tone::Caution,
            LossScore::Bad => Tone::Negative,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RttScore {
    VeryGood,
    Good,
    Acceptable,
    Poor,
    VeryPoor,
    Bad,
}

impl RttScore {
    pub fn label(self) -> &'static str {
        match self {
            RttScore::VeryGood => "very good",
            RttScore::Good => "good",
            RttScore::Acceptable => "acceptable",
            RttScore::Poor => "poor",
            RttScore::VeryPoor => "very poor",
            RttScore::Bad => "bad",
        }
    }

    pub fn tone(self) -> Tone {
        match self {
            RttScore::VeryGood | RttScore::Good => Tone::Positive,
            RttScore::Acceptable => Tone::Neutral,
            RttScore::Poor | RttScore::VeryPoor => Tone::Caution,
            RttScore::Bad => Tone::Negative,
        }
    }
}

/// Jitter below this many milliseconds is very good for the given average RTT
pub fn relative_jitter_threshold(avg_rtt_ms: f64) -> f64 {
    avg_rtt_ms * RELATIVE_JITTER_FACTOR
}

/// Rate jitter against the round's own latency first, then absolute bounds
pub fn classify_jitter(jitter_ms: f64, avg_rtt_ms: f64) -> JitterScore {
    if jitter_ms <= relative_jitter_threshold(avg_rtt_ms) {
        JitterScore::VeryGood
    } else if jitter_ms <= GOOD_JITTER_MS {
        JitterScore::Good
    } else if jitter_ms <= FAIR_JITTER_MS {
        JitterScore::Fair
    } else {
        JitterScore::Bad
    }
}

/// Rate packet loss by the ratio of lost to *received* probes.
///
/// With no replies at all the ratio is unbounded, which rates as bad.
pub fn classify_loss(received: usize, lost: usize) -> LossScore {
    if lost == 0 {
        return LossScore::Good;
    }
    if received == 0 {
        return LossScore::Bad;
    }

    let ratio = lost as f64 / received as f64;
    if ratio <= FAIR_LOSS_RATIO {
        LossScore::Fair
    } else {
        LossScore::Bad
    }
}

pub fn classify_rtt(avg_rtt_ms: f64) -> RttScore {
    const BANDS: [RttScore; 5] = [
        RttScore::VeryGood,
        RttScore::Good,
        RttScore::Acceptable,
        RttScore::Poor,
        RttScore::VeryPoor,
    ];

    RTT_BAND_LIMITS_MS
        .iter()
        .zip(BANDS)
        .find(|(limit, _)| avg_rtt_ms <= **limit)
        .map(|(_, band)| band)
        .unwrap_or(RttScore::Bad)
}

/// All three scores of one round.
///
/// Jitter and RTT scores are absent when their inputs are undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Scores {
    pub jitter: Option<JitterScore>,
    pub loss: LossScore,
    pub rtt: Option<RttScore>,
}

impl Scores {
    pub fn for_round(round: &Round, jitter: &JitterResult) -> Self {
        let avg_rtt_ms = round.avg_rtt_ms();
        let jitter_score = match (jitter.value_ms(), avg_rtt_ms) {
            (Some(jitter_ms), Some(avg)) => Some(classify_jitter(jitter_ms, avg)),
            _ => None,
        };

        Self {
            jitter: jitter_score,
            loss: classify_loss(round.received(), round.lost()),
            rtt: avg_rtt_ms.map(classify_rtt),
        }
    }
}
