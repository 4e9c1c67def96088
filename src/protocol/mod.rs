//! Wire format of echo probes

pub mod error;
pub mod message;

pub use error::{ProtocolError, Result as ProtocolResult};
pub use message::{ProbePacket, SequenceNumber, PACKET_SIZE};
