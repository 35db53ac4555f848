//! Packet integrity: 8-bit sum checksum or CRC16-CCITT
//!
//! The receiver picks the mode during negotiation by the probe character
//! it sends; the sender follows. The mode never changes mid-session.

use crc::{Crc, CRC_16_XMODEM};

/// CRC16-CCITT as used by XMODEM (poly 0x1021, init 0, no reflection)
const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Probe character requesting CRC mode
pub const CRC_PROBE: u8 = b'C';

/// Probe character requesting checksum mode (same byte as NAK)
pub const CHECKSUM_PROBE: u8 = 0x15;

/// Integrity check appended to every data packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IntegrityMode {
    /// 1-byte arithmetic sum of the payload
    Checksum,
    /// 2-byte CRC16-CCITT, high byte first
    Crc16,
}

impl IntegrityMode {
    /// Trailer length in bytes
    pub const fn trailer_len(self) -> usize {
        match self {
            IntegrityMode::Checksum => 1,
            IntegrityMode::Crc16 => 2,
        }
    }

    /// Probe character a receiver sends to request this mode
    pub const fn probe(self) -> u8 {
        match self {
            IntegrityMode::Checksum => CHECKSUM_PROBE,
            IntegrityMode::Crc16 => CRC_PROBE,
        }
    }

    /// Mode requested by a receiver's probe character
    pub fn from_probe(byte: u8) -> Option<Self> {
        match byte {
            CRC_PROBE => Some(IntegrityMode::Crc16),
            CHECKSUM_PROBE => Some(IntegrityMode::Checksum),
            _ => None,
        }
    }

    /// Write the trailer for `payload` into `out`
    ///
    /// `out` must hold at least [`IntegrityMode::trailer_len`] bytes.
    pub fn write_trailer(self, payload: &[u8], out: &mut [u8]) {
        match self {
            IntegrityMode::Checksum => out[0] = checksum(payload),
            IntegrityMode::Crc16 => out[..2].copy_from_slice(&crc16(payload).to_be_bytes()),
        }
    }

    /// Check a received trailer against `payload`
    pub fn verify(self, payload: &[u8], trailer: &[u8]) -> bool {
        if trailer.len() != self.trailer_len() {
            return false;
        }
        match self {
            IntegrityMode::Checksum => trailer[0] == checksum(payload),
            IntegrityMode::Crc16 => u16::from_be_bytes([trailer[0], trailer[1]]) == crc16(payload),
        }
    }
}

/// Unsigned 8-bit wrapping sum of all bytes
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// CRC16-CCITT (XMODEM variant)
pub fn crc16(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}
