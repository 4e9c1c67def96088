use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{bounded, select};
use jitterscope::monitor::{cancel_pair, init_logging_with_config, Monitor, MonitorConfig, Reporter};
use std::io;
use std::thread;
use tracing::{error, info, warn};

fn main() {
    let config = MonitorConfig::parse();

    init_logging_with_config(&config.log_level, config.is_json_format());

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        eprintln!("{}", e);
        std::process::exit(1);
    }

    if config.no_color {
        colored::control::set_override(false);
    }

    if let Err(e) = run(config) {
        error!(error = %e, "Monitor failed");
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(config: MonitorConfig) -> Result<()> {
    let (signal_tx, signal_rx) = bounded(1);
    ctrlc::set_handler(move || {
        let _ = signal_tx.try_send(());
    })
    .context("Failed to register interrupt handler")?;

    let (cancel, token) = cancel_pair();
    let (done_tx, done_rx) = bounded(1);

    let prober = config.prober();
    let reporter = Reporter::new(config.output);
    let settings = config.settings();

    let worker = thread::Builder::new()
        .name("monitor".into())
        .spawn(move || {
            let mut monitor = Monitor::new(prober, io::stdout(), reporter, settings);
            let _ = done_tx.send(monitor.run(&token));
        })
        .context("Failed to spawn monitor thread")?;

    select! {
        recv(signal_rx) -> _ => {
            info!("Interrupt received, stopping monitor");
            cancel.cancel();

            match done_rx.recv_timeout(config.shutdown_grace()) {
                Ok(outcome) => {
                    let rounds = outcome.context("Monitoring stopped")?;
                    let _ = worker.join();
                    info!(rounds = rounds, "Monitor shut down cleanly");
                }
                Err(_) => warn!("Round still in flight after grace period, exiting anyway"),
            }
            Ok(())
        }
        recv(done_rx) -> outcome => {
            let _ = worker.join();
            match outcome {
                Ok(Ok(rounds)) => {
                    info!(rounds = rounds, "Monitor finished");
                    Ok(())
                }
                Ok(Err(e)) => Err(e).context("Monitoring stopped"),
                Err(_) => anyhow::bail!("monitor thread exited without a result"),
            }
        }
    }
}
