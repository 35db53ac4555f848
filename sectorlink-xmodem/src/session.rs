//! Per-transfer session state
//!
//! One session exists per transfer command. It owns the open storage handle
//! and the negotiated integrity mode, and is consumed by [`Session::close`]
//! so the handle cannot outlive the transfer.

use sectorlink_hal::{BlockStorage, OpenMode};

use crate::error::TransferError;
use crate::integrity::IntegrityMode;

/// Which end of the transfer this session drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    /// Reads from storage and transmits
    Sender,
    /// Receives and writes to storage
    Receiver,
}

impl Role {
    /// Storage open mode for this role
    pub fn open_mode(self) -> OpenMode {
        match self {
            Role::Sender => OpenMode::ReadOnly,
            Role::Receiver => OpenMode::CreateExclusive,
        }
    }
}

/// Transfer session
pub struct Session<'s, B: BlockStorage> {
    storage: &'s mut B,
    handle: B::Handle,
    role: Role,
    mode: Option<IntegrityMode>,
    seq: u8,
    failures: u8,
    bytes: u32,
}

impl<'s, B: BlockStorage> Session<'s, B> {
    /// Open `name` for the given role and start a fresh session
    pub fn open(storage: &'s mut B, name: &str, role: Role) -> Result<Self, TransferError<B::Error>> {
        let handle = storage
            .open(name, role.open_mode())
            .map_err(TransferError::Open)?;

        Ok(Self {
            storage,
            handle,
            role,
            mode: None,
            seq: 1,
            failures: 0,
            bytes: 0,
        })
    }

    /// Session role
    pub fn role(&self) -> Role {
        self.role
    }

    /// Negotiated integrity mode, if negotiation has completed
    pub fn mode(&self) -> Option<IntegrityMode> {
        self.mode
    }

    /// Sequence number of the next packet
    pub fn seq(&self) -> u8 {
        self.seq
    }

    /// Consecutive failures on the current packet
    pub fn failures(&self) -> u8 {
        self.failures
    }

    /// Bytes moved so far
    pub fn bytes(&self) -> u32 {
        self.bytes
    }

    /// Fix the integrity mode for the rest of the session
    ///
    /// The first call wins; later calls return the already fixed mode.
    pub fn negotiate(&mut self, mode: IntegrityMode) -> IntegrityMode {
        *self.mode.get_or_insert(mode)
    }

    /// Move to the next packet after `bytes` were delivered
    pub fn advance(&mut self, bytes: usize) {
        self.seq = self.seq.wrapping_add(1);
        self.failures = 0;
        self.bytes = self.bytes.saturating_add(bytes as u32);
    }

    /// Count one failure; returns `true` once the budget is spent
    pub fn record_failure(&mut self, budget: u8) -> bool {
        self.failures = self.failures.saturating_add(1);
        self.failures >= budget
    }

    /// Write a whole payload to storage
    pub fn write_payload(&mut self, data: &[u8]) -> Result<(), TransferError<B::Error>> {
        let mut written = 0;
        while written < data.len() {
            let n = self
                .storage
                .write(&mut self.handle, &data[written..])
                .map_err(TransferError::Io)?;
            if n == 0 {
                return Err(TransferError::StorageFull);
            }
            written += n;
        }
        Ok(())
    }

    /// Fill `buf` from storage
    ///
    /// Short reads are retried until the buffer is full or storage reports
    /// end of data. Returns the number of bytes placed in `buf`.
    pub fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, TransferError<B::Error>> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self
                .storage
                .read(&mut self.handle, &mut buf[filled..])
                .map_err(TransferError::Io)?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }

    /// End the session, releasing the storage handle
    pub fn close(self) -> Result<(), B::Error> {
        self.storage.close(self.handle)
    }
}
