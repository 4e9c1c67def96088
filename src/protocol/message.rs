use crate::protocol::error::{ProtocolError, Result};
use tracing::debug;

/// Size of an encoded probe in bytes (sequence + send offset)
pub const PACKET_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SequenceNumber(pub u64);

/// One echo probe.
///
/// The reflector sends the datagram back verbatim, so everything the prober
/// needs to match a reply travels inside the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbePacket {
    pub sequence: SequenceNumber,
    /// Nanoseconds between the start of the round and this probe's send.
    pub sent_offset_ns: u64,
}

impl ProbePacket {
    pub fn new(sequence: SequenceNumber, sent_offset_ns: u64) -> Self {
        Self {
            sequence,
            sent_offset_ns,
        }
    }

    pub fn encode(&self) -> [u8; PACKET_SIZE] {
        let mut buf = [0u8; PACKET_SIZE];
        buf[..8].copy_from_slice(&self.sequence.0.to_le_bytes());
        buf[8..].copy_from_slice(&self.sent_offset_ns.to_le_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < PACKET_SIZE {
            debug!(
                expected = PACKET_SIZE,
                actual = bytes.len(),
                "Invalid probe size"
            );
            return Err(ProtocolError::InvalidPacketSize {
                expected: PACKET_SIZE,
                actual: bytes.len(),
            });
        }

        let mut word = [0u8; 8];
        word.copy_from_slice(&bytes[..8]);
        let sequence = u64::from_le_bytes(word);
        word.copy_from_slice(&bytes[8..PACKET_SIZE]);
        let sent_offset_ns = u64::from_le_bytes(word);

        Ok(Self {
            sequence: SequenceNumber(sequence),
            sent_offset_ns,
        })
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_probe_encode_decode_roundtrip(seq in any::<u64>(), offset in any::<u64>()) {
            let original = ProbePacket::new(SequenceNumber(seq), offset);
            let decoded = ProbePacket::decode(&original.encode()).unwrap();
            prop_assert_eq!(original, decoded);
        }
    }
}
