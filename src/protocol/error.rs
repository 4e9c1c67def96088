use thiserror::Error;

/// Protocol-level errors for probe packet encoding/decoding
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid probe size: expected {expected}, got {actual}")]
    InvalidPacketSize { expected: usize, actual: usize },

    #[error("ICMP message type {0} is not an echo reply")]
    UnexpectedIcmpType(u8),

    #[error("Echo reply for identifier {actual}, expected {expected}")]
    ForeignIdentifier { expected: u16, actual: u16 },
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
