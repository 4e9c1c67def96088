use crate::protocol::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Network I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Probe round failed: {0}")]
    Probe(String),

    #[error("Socket error: {0}")]
    Socket(String),

    #[error("Insufficient privilege: {0}")]
    Privilege(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
