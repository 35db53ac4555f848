//! Transfer configuration
//!
//! Defaults match the classic XMODEM timing so any stock terminal program
//! (Tera Term, minicom, lrzsz) interoperates without tuning.

use crate::packet::PacketSize;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Base per-byte timeout (ms)
pub const DEFAULT_BYTE_TIMEOUT_MS: u32 = 1000;

/// Negotiation / header wait timeout (ms)
pub const DEFAULT_NEGOTIATION_TIMEOUT_MS: u32 = 2 * DEFAULT_BYTE_TIMEOUT_MS;

/// Quiet period that ends an input flush (ms)
pub const DEFAULT_FLUSH_TIMEOUT_MS: u32 = DEFAULT_BYTE_TIMEOUT_MS * 3 / 2;

/// Consecutive failures / retransmissions tolerated per packet
pub const DEFAULT_MAX_RETRIES: u8 = 25;

/// Probe or header waits before giving up on the peer
pub const DEFAULT_MAX_NEGOTIATION_ATTEMPTS: u8 = 16;

/// EOT transmissions before giving up on the final ACK
pub const DEFAULT_MAX_EOT_ATTEMPTS: u8 = 10;

/// Number of CAN bytes sent when aborting
pub const CANCEL_BURST: usize = 3;

/// XMODEM session parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct XmodemConfig {
    /// Wait for each byte inside a packet and for ACK/NAK (ms)
    pub byte_timeout_ms: u32,
    /// Wait for each negotiation probe response or packet header (ms)
    pub negotiation_timeout_ms: u32,
    /// Quiet time that ends an input flush (ms)
    pub flush_timeout_ms: u32,
    /// Failure / retransmission budget per packet
    pub max_retries: u8,
    /// Attempts per negotiation phase
    pub max_negotiation_attempts: u8,
    /// EOT attempts at end of transfer
    pub max_eot_attempts: u8,
    /// Payload profile used when sending
    ///
    /// The receiver accepts either profile regardless of this setting.
    pub packet_size: PacketSize,
}

impl Default for XmodemConfig {
    fn default() -> Self {
        Self {
            byte_timeout_ms: DEFAULT_BYTE_TIMEOUT_MS,
            negotiation_timeout_ms: DEFAULT_NEGOTIATION_TIMEOUT_MS,
            flush_timeout_ms: DEFAULT_FLUSH_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            max_negotiation_attempts: DEFAULT_MAX_NEGOTIATION_ATTEMPTS,
            max_eot_attempts: DEFAULT_MAX_EOT_ATTEMPTS,
            packet_size: PacketSize::Standard,
        }
    }
}

impl XmodemConfig {
    /// Default timing with the 1K payload profile for sending
    pub fn one_k() -> Self {
        Self {
            packet_size: PacketSize::OneK,
            ..Self::default()
        }
    }

    /// Same budgets with every timeout replaced
    ///
    /// Used to shorten waits on links where the peer answers instantly.
    pub fn with_timeouts(self, byte_ms: u32, negotiation_ms: u32, flush_ms: u32) -> Self {
        Self {
            byte_timeout_ms: byte_ms,
            negotiation_timeout_ms: negotiation_ms,
            flush_timeout_ms: flush_ms,
            ..self
        }
    }
}
