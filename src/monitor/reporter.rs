use crate::monitor::error::{MonitorError, Result};
use crate::monitor::jitter::JitterResult;
use crate::monitor::quality::{relative_jitter_threshold, Scores, Tone};
use crate::monitor::sample::{duration_ms, Round, Sample};
use clap::ValueEnum;
use colored::*;
use serde::Serialize;
use std::io::Write;
use tracing::{debug, info};

/// How round reports are written to the output sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable multi-line text
    Text,
    /// One JSON object per round
    Json,
}

/// Everything the reporter needs to describe one finished round
#[derive(Debug, Clone)]
pub struct RoundReport<'a> {
    pub index: u64,
    pub round: &'a Round,
    pub jitter: JitterResult,
    pub scores: Scores,
    pub median_ms: Option<f64>,
    pub p90_ms: Option<f64>,
}

/// Machine-readable form of a [`RoundReport`]
#[derive(Debug, Serialize)]
pub struct RoundRecord {
    pub measurement: u64,
    pub target: String,
    pub sent: usize,
    pub received: usize,
    pub lost: usize,
    pub loss_percent: f64,
    pub min_rtt_ms: Option<f64>,
    pub max_rtt_ms: Option<f64>,
    pub avg_rtt_ms: Option<f64>,
    pub median_rtt_ms: Option<f64>,
    pub p90_rtt_ms: Option<f64>,
    pub jitter_ms: Option<f64>,
    pub jitter_threshold_ms: Option<f64>,
    pub scores: Scores,
}

impl From<&RoundReport<'_>> for RoundRecord {
    fn from(report: &RoundReport<'_>) -> Self {
        let round = report.round;
        Self {
            measurement: report.index,
            target: round.target().to_string(),
            sent: round.sent(),
            received: round.received(),
            lost: round.lost(),
            loss_percent: round.loss_percent(),
            min_rtt_ms: round.min_rtt().map(duration_ms),
            max_rtt_ms: round.max_rtt().map(duration_ms),
            avg_rtt_ms: round.avg_rtt_ms(),
            median_rtt_ms: report.median_ms,
            p90_rtt_ms: report.p90_ms,
            jitter_ms: report.jitter.value_ms(),
            jitter_threshold_ms: round.avg_rtt_ms().map(relative_jitter_threshold),
            scores: report.scores,
        }
    }
}

/// Reporter for writing banners, replies and round summaries
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    format: OutputFormat,
}

impl Reporter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn paint(text: &str, tone: Tone) -> ColoredString {
        match tone {
            Tone::Positive => text.green(),
            Tone::Neutral => text.normal(),
            Tone::Caution => text.yellow(),
            Tone::Negative => text.red().bold(),
        }
    }

    fn score_cell(score: Option<(&'static str, Tone)>) -> String {
        match score {
            Some((label, tone)) => Self::paint(label, tone).to_string(),
            None => "n/a".dimmed().to_string(),
        }
    }

    /// Start-up text explaining what is measured and how to stop
    pub fn render_banner(target: &str, count: usize) -> String {
        format!(
            "{}\n\
             This tool will measure the jitter by probing {} {} times per round\n\
             You can end measuring by using ctrl+c\n\
             \n\
             What is a good jitter?\n\
             A jitter below 15% of the average round trip time is very good.\n",
            "PING and JITTER Measurement".bold(),
            target,
            count
        )
    }

    /// One line per answered probe, in arrival order
    pub fn render_reply(target: &str, sample: &Sample) -> String {
        format!(
            "Reply from {}: seq={} time={:.2}ms",
            target,
            sample.seq,
            sample.rtt_ms()
        )
    }

    fn render_rtts(report: &RoundReport<'_>) -> String {
        let round = report.round;
        let (Some(min), Some(max), Some(avg)) = (round.min_rtt(), round.max_rtt(), round.avg_rtt())
        else {
            return "Approximate round trip times: no replies received\n".to_string();
        };

        let mut text = format!(
            "Approximate round trip times in milli-seconds:\n\
             \tMinimum = {:.2}ms, Maximum = {:.2}ms, Average = {:.2}ms\n",
            duration_ms(min),
            duration_ms(max),
            duration_ms(avg)
        );
        if let (Some(median), Some(p90)) = (report.median_ms, report.p90_ms) {
            text.push_str(&format!("\tMedian = {:.2}ms, P90 = {:.2}ms\n", median, p90));
        }
        text
    }

    fn render_jitter(jitter: JitterResult, avg_rtt_ms: Option<f64>) -> String {
        match (jitter, avg_rtt_ms) {
            (JitterResult::Measured { jitter_ms, .. }, Some(avg)) => {
                let variance = if avg > 0.0 {
                    jitter_ms / avg * 100.0
                } else {
                    0.0
                };
                format!(
                    "Jitter: {:.2}ms, Variance: {:.1}% of average (very good up to {:.2}ms)\n",
                    jitter_ms,
                    variance,
                    relative_jitter_threshold(avg)
                )
            }
            (jitter, _) => {
                let samples = match jitter {
                    JitterResult::Insufficient { samples } => samples,
                    JitterResult::Measured { intervals, .. } => intervals + 1,
                };
                format!(
                    "Jitter: {} ({} {}, need at least 2)\n",
                    "insufficient data".yellow(),
                    samples,
                    if samples == 1 { "reply" } else { "replies" }
                )
            }
        }
    }

    /// Multi-line text summary of one round
    pub fn render_round(report: &RoundReport<'_>) -> String {
        let round = report.round;
        let scores = &report.scores;

        let mut text = format!(
            "\n{}\n\
             Ping stats for {}:\n\
             \tPackets: Sent = {}, Received = {}, Lost = {} ({:.1}% loss)\n",
            format!("Measurement #{}", report.index).bold(),
            round.target(),
            round.sent(),
            round.received(),
            round.lost(),
            round.loss_percent()
        );
        text.push_str(&Self::render_rtts(report));
        text.push_str(&Self::render_jitter(report.jitter, round.avg_rtt_ms()));
        text.push_str(&format!(
            "Scores:\n\
             \tJitter:      {}\n\
             \tPacket loss: {}\n\
             \tLatency:     {}\n",
            Self::score_cell(scores.jitter.map(|s| (s.label(), s.tone()))),
            Self::score_cell(Some((scores.loss.label(), scores.loss.tone()))),
            Self::score_cell(scores.rtt.map(|s| (s.label(), s.tone())))
        ));
        text
    }

    pub fn write_banner<W: Write>(&self, out: &mut W, target: &str, count: usize) -> Result<()> {
        if self.format == OutputFormat::Json {
            return Ok(());
        }
        out.write_all(Self::render_banner(target, count).as_bytes())?;
        out.flush()?;
        Ok(())
    }

    pub fn write_reply<W: Write>(&self, out: &mut W, target: &str, sample: &Sample) -> Result<()> {
        if self.format == OutputFormat::Json {
            return Ok(());
        }
        writeln!(out, "{}", Self::render_reply(target, sample))?;
        Ok(())
    }

    /// Write one round in the configured format
    pub fn write_round<W: Write>(&self, out: &mut W, report: &RoundReport<'_>) -> Result<()> {
        debug!(
            measurement = report.index,
            received = report.round.received(),
            lost = report.round.lost(),
            "Reporting round"
        );

        match self.format {
            OutputFormat::Text => out.write_all(Self::render_round(report).as_bytes())?,
            OutputFormat::Json => {
                let record = RoundRecord::from(report);
                serde_json::to_writer(&mut *out, &record)?;
                out.write_all(b"\n")?;
            }
        }
        out.flush()
            .map_err(|e| MonitorError::Output(format!("Failed to flush report: {}", e)))?;

        info!(
            measurement = report.index,
            jitter_ms = report.jitter.value_ms(),
            avg_rtt_ms = report.round.avg_rtt_ms(),
            lost = report.round.lost(),
            "Round reported"
        );
        Ok(())
    }
}
