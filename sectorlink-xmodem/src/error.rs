//! Terminal transfer errors
//!
//! Single-wait timeouts never appear here: they are folded into the retry
//! budgets and only budget exhaustion becomes a caller-visible error.

use core::fmt;

use crate::packet::PacketError;

/// Why a transfer ended without success
///
/// `E` is the block-storage error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferError<E> {
    /// Peer never answered negotiation, or went silent between packets
    Sync,
    /// Peer sent the double-CAN cancel handshake
    Canceled,
    /// Local retry / failure budget exhausted
    TooManyRetries,
    /// Peer never acknowledged end of transmission
    EotUnacknowledged,
    /// Storage refused to open the file
    Open(E),
    /// Storage read, write or close failed
    Io(E),
    /// Storage accepted none of a write
    StorageFull,
    /// Outgoing packet could not be framed
    Encode(PacketError),
}

impl<E> From<PacketError> for TransferError<E> {
    fn from(e: PacketError) -> Self {
        TransferError::Encode(e)
    }
}

impl<E> TransferError<E> {
    /// Negative status code for the command layer
    pub fn code(&self) -> i32 {
        match self {
            TransferError::Canceled => -1,
            TransferError::Sync => -2,
            TransferError::TooManyRetries => -3,
            TransferError::Io(_) => -4,
            TransferError::EotUnacknowledged => -5,
            TransferError::Open(_) => -6,
            TransferError::StorageFull => -7,
            TransferError::Encode(_) => -8,
        }
    }

    /// Check if the peer ended the session
    pub fn is_remote(&self) -> bool {
        matches!(self, TransferError::Canceled)
    }

    /// Check if the storage port caused the failure
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            TransferError::Open(_) | TransferError::Io(_) | TransferError::StorageFull
        )
    }
}

impl<E: fmt::Debug> fmt::Display for TransferError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::Sync => f.write_str("no response from peer"),
            TransferError::Canceled => f.write_str("canceled by remote"),
            TransferError::TooManyRetries => f.write_str("too many retries"),
            TransferError::EotUnacknowledged => f.write_str("end of transmission not acknowledged"),
            TransferError::Open(e) => write!(f, "cannot open file: {:?}", e),
            TransferError::Io(e) => write!(f, "storage error: {:?}", e),
            TransferError::StorageFull => f.write_str("storage full"),
            TransferError::Encode(e) => write!(f, "packet encode failed: {:?}", e),
        }
    }
}

/// Result of one transfer: bytes moved, or why it failed
pub type TransferOutcome<E> = Result<u32, TransferError<E>>;

/// Collapse an outcome into the command layer's integer convention
///
/// Non-negative values are byte counts; negative values are [`TransferError::code`].
pub fn outcome_code<E>(outcome: &TransferOutcome<E>) -> i32 {
    match outcome {
        Ok(bytes) => i32::try_from(*bytes).unwrap_or(i32::MAX),
        Err(e) => e.code(),
    }
}
