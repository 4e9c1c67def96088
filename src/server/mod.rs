//! UDP echo reflector answering the monitor's probes

pub mod config;
pub mod echo;

pub use config::ServerConfig;
pub use echo::{EchoServer, ServerCounters, ServerError, ServerStats};
