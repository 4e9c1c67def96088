use anyhow::{Context, Result};
use clap::Parser;
use jitterscope::monitor::{cancel_pair, init_logging_with_config};
use jitterscope::server::{EchoServer, ServerConfig};
use tracing::{error, info};

fn main() {
    let config = ServerConfig::parse();

    init_logging_with_config(&config.log_level, config.is_json_format());

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(config) {
        error!(error = %e, "Server failed");
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(config: ServerConfig) -> Result<()> {
    let addr = config.socket_addr()?;
    let server = EchoServer::bind(addr)?;

    let (cancel, token) = cancel_pair();
    let mut cancel = Some(cancel);
    ctrlc::set_handler(move || {
        if let Some(handle) = cancel.take() {
            handle.cancel();
        }
    })
    .context("Failed to register interrupt handler")?;

    info!(address = %addr, quiet_mode = config.quiet, "Ready to echo probes");
    let stats = server.serve(&token).context("Echo loop failed")?;

    if !config.quiet {
        println!(
            "Echoed {} of {} datagrams ({} errors) in {:.1}s",
            stats.packets_sent,
            stats.packets_received,
            stats.errors,
            stats.elapsed.as_secs_f64()
        );
    }
    Ok(())
}
