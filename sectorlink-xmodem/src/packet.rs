//! Packet encoding and validation for XMODEM / XMODEM-1K.
//!
//! Data packet format:
//! ```text
//! ┌────────┬─────┬──────────┬───────────────┬─────────────┐
//! │ HEADER │ SEQ │ 255-SEQ  │ PAYLOAD       │ TRAILER     │
//! │ 1B     │ 1B  │ 1B       │ 128B / 1024B  │ 1B sum or   │
//! │        │     │          │               │ 2B CRC (BE) │
//! └────────┴─────┴──────────┴───────────────┴─────────────┘
//! ```
//!
//! Control bytes (EOT, ACK, NAK, CAN) travel alone, without framing.

use heapless::Vec;

use crate::integrity::IntegrityMode;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Start of a 128-byte data packet
pub const SOH: u8 = 0x01;
/// Start of a 1024-byte data packet
pub const STX: u8 = 0x02;
/// End of transmission
pub const EOT: u8 = 0x04;
/// Positive acknowledge
pub const ACK: u8 = 0x06;
/// Negative acknowledge
pub const NAK: u8 = 0x15;
/// Cancel (sent in pairs or triples)
pub const CAN: u8 = 0x18;
/// Padding for a short final chunk (Ctrl-Z)
pub const FILL: u8 = 0x1A;

/// Header, sequence number and its complement
pub const HEADER_LEN: usize = 3;

/// Largest possible packet: 1K payload with CRC trailer
pub const MAX_PACKET_SIZE: usize = HEADER_LEN + 1024 + 2;

/// Buffer holding one complete packet
pub type PacketBuf = Vec<u8, MAX_PACKET_SIZE>;

/// Errors that can occur while building a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketError {
    /// Payload is longer than the packet profile
    PayloadTooLarge,
    /// Output buffer cannot hold the packet
    BufferTooSmall,
}

/// Payload size profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PacketSize {
    /// Classic XMODEM, 128-byte payload
    #[default]
    Standard,
    /// XMODEM-1K, 1024-byte payload
    OneK,
}

impl PacketSize {
    /// Payload bytes per packet
    pub const fn payload_len(self) -> usize {
        match self {
            PacketSize::Standard => 128,
            PacketSize::OneK => 1024,
        }
    }

    /// Header byte announcing this profile
    pub const fn header(self) -> u8 {
        match self {
            PacketSize::Standard => SOH,
            PacketSize::OneK => STX,
        }
    }

    /// Profile announced by a header byte
    pub fn from_header(byte: u8) -> Option<Self> {
        match byte {
            SOH => Some(PacketSize::Standard),
            STX => Some(PacketSize::OneK),
            _ => None,
        }
    }

    /// Full packet length under the given integrity mode
    pub const fn packet_len(self, mode: IntegrityMode) -> usize {
        HEADER_LEN + self.payload_len() + mode.trailer_len()
    }
}

/// Outcome of checking a received packet against the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Validation {
    /// Next packet in sequence, intact
    Accepted,
    /// Intact repeat of the last accepted packet (our ACK was lost)
    DuplicateOfPrevious,
    /// Corrupt, truncated, or out of sequence
    Rejected,
}

/// An outgoing data packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet<'a> {
    /// Sequence number (wraps mod 256)
    pub seq: u8,
    /// Payload, at most one profile long; shorter payloads are padded
    pub payload: &'a [u8],
    /// Payload size profile
    pub size: PacketSize,
}

impl<'a> Packet<'a> {
    /// Create a packet, checking the payload fits the profile
    pub fn new(seq: u8, payload: &'a [u8], size: PacketSize) -> Result<Self, PacketError> {
        if payload.len() > size.payload_len() {
            return Err(PacketError::PayloadTooLarge);
        }
        Ok(Self { seq, payload, size })
    }

    /// Encode this packet into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, mode: IntegrityMode, buffer: &mut [u8]) -> Result<usize, PacketError> {
        let payload_len = self.size.payload_len();
        let packet_len = self.size.packet_len(mode);
        if self.payload.len() > payload_len {
            return Err(PacketError::PayloadTooLarge);
        }
        if buffer.len() < packet_len {
            return Err(PacketError::BufferTooSmall);
        }

        buffer[0] = self.size.header();
        buffer[1] = self.seq;
        buffer[2] = !self.seq;

        let body = &mut buffer[HEADER_LEN..HEADER_LEN + payload_len];
        body[..self.payload.len()].copy_from_slice(self.payload);
        body[self.payload.len()..].fill(FILL);

        let (body, trailer) = buffer[HEADER_LEN..packet_len].split_at_mut(payload_len);
        mode.write_trailer(body, trailer);

        Ok(packet_len)
    }

    /// Encode this packet into a heapless Vec
    pub fn encode_to_vec(&self, mode: IntegrityMode) -> Result<PacketBuf, PacketError> {
        let mut buffer = [0u8; MAX_PACKET_SIZE];
        let len = self.encode(mode, &mut buffer)?;
        let mut vec = Vec::new();
        vec.extend_from_slice(&buffer[..len])
            .map_err(|_| PacketError::BufferTooSmall)?;
        Ok(vec)
    }
}

/// Encode one data packet
///
/// Short payloads are padded with [`FILL`] up to the profile size.
pub fn encode(
    seq: u8,
    payload: &[u8],
    size: PacketSize,
    mode: IntegrityMode,
) -> Result<PacketBuf, PacketError> {
    Packet::new(seq, payload, size)?.encode_to_vec(mode)
}

/// Check a complete received packet (header byte included)
///
/// The complement and trailer are checked before the sequence number, so a
/// damaged packet is never mistaken for a duplicate.
pub fn validate(raw: &[u8], expected_seq: u8, mode: IntegrityMode) -> Validation {
    let size = match raw.first().copied().and_then(PacketSize::from_header) {
        Some(size) => size,
        None => return Validation::Rejected,
    };
    if raw.len() != size.packet_len(mode) {
        return Validation::Rejected;
    }

    let seq = raw[1];
    if raw[2] != !seq {
        return Validation::Rejected;
    }

    let (payload, trailer) = raw[HEADER_LEN..].split_at(size.payload_len());
    if !mode.verify(payload, trailer) {
        return Validation::Rejected;
    }

    if seq == expected_seq {
        Validation::Accepted
    } else if seq == expected_seq.wrapping_sub(1) {
        Validation::DuplicateOfPrevious
    } else {
        Validation::Rejected
    }
}

/// Payload slice of a complete packet
///
/// Returns `None` if the header is not a data header or the packet is short.
pub fn payload(raw: &[u8]) -> Option<&[u8]> {
    let size = PacketSize::from_header(*raw.first()?)?;
    raw.get(HEADER_LEN..HEADER_LEN + size.payload_len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_standard_checksum() {
        let packet = encode(1, &[1, 2, 3], PacketSize::Standard, IntegrityMode::Checksum).unwrap();

        assert_eq!(packet.len(), 132);
        assert_eq!(packet[0], SOH);
        assert_eq!(packet[1], 1);
        assert_eq!(packet[2], 0xFE);
        assert_eq!(&packet[3..6], &[1, 2, 3]);
        // remainder of the payload is fill
        assert!(packet[6..131].iter().all(|&b| b == FILL));
        assert_eq!(packet[131], crate::integrity::checksum(&packet[3..131]));
    }

    #[test]
    fn test_encode_onek_crc() {
        let data = [0x55u8; 1024];
        let packet = encode(7, &data, PacketSize::OneK, IntegrityMode::Crc16).unwrap();

        assert_eq!(packet.len(), 1029);
        assert_eq!(packet[0], STX);
        assert_eq!(packet[1], 7);
        assert_eq!(packet[2], 248);
        let crc = crate::integrity::crc16(&data);
        assert_eq!(packet[1027], (crc >> 8) as u8);
        assert_eq!(packet[1028], crc as u8);
    }

    #[test]
    fn test_encode_payload_too_large() {
        let data = [0u8; 129];
        let result = encode(1, &data, PacketSize::Standard, IntegrityMode::Crc16);
        assert_eq!(result, Err(PacketError::PayloadTooLarge));
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let packet = Packet::new(1, &[1], PacketSize::Standard).unwrap();
        let mut buffer = [0u8; 100];
        assert_eq!(
            packet.encode(IntegrityMode::Checksum, &mut buffer),
            Err(PacketError::BufferTooSmall)
        );
    }

    #[test]
    fn test_validate_accepted() {
        let packet = encode(3, b"hello", PacketSize::Standard, IntegrityMode::Crc16).unwrap();
        assert_eq!(validate(&packet, 3, IntegrityMode::Crc16), Validation::Accepted);
        assert_eq!(&payload(&packet).unwrap()[..5], b"hello");
    }

    #[test]
    fn test_validate_duplicate() {
        let packet = encode(3, b"hello", PacketSize::Standard, IntegrityMode::Checksum).unwrap();
        assert_eq!(
            validate(&packet, 4, IntegrityMode::Checksum),
            Validation::DuplicateOfPrevious
        );
    }

    #[test]
    fn test_validate_duplicate_across_wrap() {
        let packet = encode(255, b"x", PacketSize::Standard, IntegrityMode::Crc16).unwrap();
        assert_eq!(
            validate(&packet, 0, IntegrityMode::Crc16),
            Validation::DuplicateOfPrevious
        );
    }

    #[test]
    fn test_validate_out_of_sequence() {
        let packet = encode(9, b"x", PacketSize::Standard, IntegrityMode::Crc16).unwrap();
        assert_eq!(validate(&packet, 3, IntegrityMode::Crc16), Validation::Rejected);
    }

    #[test]
    fn test_validate_bad_complement() {
        let mut packet = encode(3, b"x", PacketSize::Standard, IntegrityMode::Crc16).unwrap();
        packet[2] = 0x00;
        assert_eq!(validate(&packet, 3, IntegrityMode::Crc16), Validation::Rejected);
    }

    #[test]
    fn test_validate_bad_trailer_rejected_even_if_seq_matches() {
        let mut packet = encode(3, b"x", PacketSize::Standard, IntegrityMode::Checksum).unwrap();
        let last = packet.len() - 1;
        packet[last] ^= 0x01;
        assert_eq!(validate(&packet, 3, IntegrityMode::Checksum), Validation::Rejected);
    }

    #[test]
    fn test_validate_wrong_mode_length() {
        let packet = encode(1, b"x", PacketSize::Standard, IntegrityMode::Checksum).unwrap();
        assert_eq!(validate(&packet, 1, IntegrityMode::Crc16), Validation::Rejected);
    }

    #[test]
    fn test_validate_non_data_header() {
        let mut packet = encode(1, b"x", PacketSize::Standard, IntegrityMode::Crc16).unwrap();
        packet[0] = EOT;
        assert_eq!(validate(&packet, 1, IntegrityMode::Crc16), Validation::Rejected);
        assert_eq!(validate(&[], 1, IntegrityMode::Crc16), Validation::Rejected);
    }

    #[test]
    fn test_packet_size_header_mapping() {
        assert_eq!(PacketSize::from_header(SOH), Some(PacketSize::Standard));
        assert_eq!(PacketSize::from_header(STX), Some(PacketSize::OneK));
        assert_eq!(PacketSize::from_header(EOT), None);
        assert_eq!(PacketSize::Standard.packet_len(IntegrityMode::Checksum), 132);
        assert_eq!(PacketSize::OneK.packet_len(IntegrityMode::Crc16), 1029);
    }
}
