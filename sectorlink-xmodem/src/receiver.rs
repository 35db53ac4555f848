//! Receiving side of an XMODEM transfer
//!
//! The receiver drives negotiation: it probes with `'C'` (CRC) and falls back
//! to NAK (checksum) if the sender stays silent. After that it waits for
//! packets, writes each new payload to storage and acknowledges.
//!
//! ```text
//! Negotiating(C) ──16 silent──▶ Negotiating(NAK) ──16 silent──▶ SyncError
//!       │                              │
//!       └──────── data header ─────────┘
//!                     ▼
//!              Packet ──bad/timeout──▶ Rejecting ──▶ Synchronized
//!                │                                      │
//!                └────────── ACK ──────────▶ Synchronized ── EOT ──▶ Done
//! ```

use sectorlink_hal::{BlockStorage, ByteStream};

use crate::config::XmodemConfig;
use crate::control::{confirm_cancel, flush_input, send_cancel};
use crate::error::{TransferError, TransferOutcome};
use crate::integrity::IntegrityMode;
use crate::packet::{self, PacketBuf, PacketSize, Validation, ACK, CAN, EOT, NAK};
use crate::session::Session;

/// Receiver states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxState {
    /// Probing the sender for the given mode
    Negotiating { mode: IntegrityMode, attempt: u8 },
    /// Mode fixed, waiting for the next header
    Synchronized { mode: IntegrityMode, attempt: u8 },
    /// Header seen, reading the packet body
    Packet { size: PacketSize, mode: IntegrityMode },
    /// Last packet was bad or truncated
    Rejecting { mode: IntegrityMode },
    /// Transfer complete with this many bytes stored
    Done(u32),
}

impl RxState {
    /// Initial state: probe for CRC mode first
    pub const fn start() -> Self {
        RxState::Negotiating {
            mode: IntegrityMode::Crc16,
            attempt: 0,
        }
    }
}

/// XMODEM receiver
pub struct Receiver<S> {
    stream: S,
    config: XmodemConfig,
    buf: PacketBuf,
}

impl<S: ByteStream> Receiver<S> {
    /// Create a receiver over a byte stream
    pub fn new(stream: S, config: XmodemConfig) -> Self {
        Self {
            stream,
            config,
            buf: PacketBuf::new(),
        }
    }

    /// Release the byte stream
    pub fn into_stream(self) -> S {
        self.stream
    }

    /// Receive a whole file into the session's storage handle
    ///
    /// Returns the number of bytes written, which is always a multiple of
    /// the packet payload size: fill bytes in the final packet are stored.
    pub fn run<B: BlockStorage>(&mut self, session: &mut Session<'_, B>) -> TransferOutcome<B::Error> {
        let mut state = RxState::start();
        loop {
            state = self.step(session, state)?;
            if let RxState::Done(bytes) = state {
                return Ok(bytes);
            }
        }
    }

    /// Perform one state transition
    pub fn step<B: BlockStorage>(
        &mut self,
        session: &mut Session<'_, B>,
        state: RxState,
    ) -> Result<RxState, TransferError<B::Error>> {
        match state {
            RxState::Negotiating { mode, attempt } => self.negotiate(session, mode, attempt),
            RxState::Synchronized { mode, attempt } => self.await_header(session, mode, attempt),
            RxState::Packet { size, mode } => self.receive_packet(session, size, mode),
            RxState::Rejecting { mode } => self.reject(session, mode),
            RxState::Done(bytes) => Ok(RxState::Done(bytes)),
        }
    }

    fn negotiate<B: BlockStorage>(
        &mut self,
        session: &mut Session<'_, B>,
        mode: IntegrityMode,
        attempt: u8,
    ) -> Result<RxState, TransferError<B::Error>> {
        if attempt >= self.config.max_negotiation_attempts {
            if mode == IntegrityMode::Crc16 {
                #[cfg(feature = "defmt")]
                defmt::debug!("No answer to CRC probe, falling back to checksum");
                return Ok(RxState::Negotiating {
                    mode: IntegrityMode::Checksum,
                    attempt: 0,
                });
            }
            return Err(self.abort(TransferError::Sync));
        }

        self.stream.write_byte(mode.probe());
        let next = match self.stream.read_byte(self.config.negotiation_timeout_ms) {
            Some(byte) => self.on_header(session, byte, mode)?,
            None => None,
        };
        Ok(next.unwrap_or(RxState::Negotiating {
            mode,
            attempt: attempt + 1,
        }))
    }

    fn await_header<B: BlockStorage>(
        &mut self,
        session: &mut Session<'_, B>,
        mode: IntegrityMode,
        attempt: u8,
    ) -> Result<RxState, TransferError<B::Error>> {
        if attempt >= self.config.max_negotiation_attempts {
            #[cfg(feature = "defmt")]
            defmt::warn!("Sender went silent after packet {}", session.seq().wrapping_sub(1));
            return Err(self.abort(TransferError::Sync));
        }

        let next = match self.stream.read_byte(self.config.negotiation_timeout_ms) {
            Some(byte) => self.on_header(session, byte, mode)?,
            None => None,
        };
        Ok(next.unwrap_or(RxState::Synchronized {
            mode,
            attempt: attempt + 1,
        }))
    }

    /// React to a byte seen where a header was expected
    ///
    /// Returns `None` when the byte means nothing here and the wait should
    /// count as silent.
    fn on_header<B: BlockStorage>(
        &mut self,
        session: &mut Session<'_, B>,
        byte: u8,
        mode: IntegrityMode,
    ) -> Result<Option<RxState>, TransferError<B::Error>> {
        if let Some(size) = PacketSize::from_header(byte) {
            let mode = session.negotiate(mode);
            self.buf.clear();
            // Capacity covers the largest packet; a header always fits
            let _ = self.buf.push(byte);
            return Ok(Some(RxState::Packet { size, mode }));
        }

        match byte {
            EOT => {
                flush_input(&mut self.stream, self.config.flush_timeout_ms);
                self.stream.write_byte(ACK);
                #[cfg(feature = "defmt")]
                defmt::info!("EOT received, {} bytes stored", session.bytes());
                Ok(Some(RxState::Done(session.bytes())))
            }
            CAN => {
                if confirm_cancel(&mut self.stream, self.config.byte_timeout_ms) {
                    flush_input(&mut self.stream, self.config.flush_timeout_ms);
                    self.stream.write_byte(ACK);
                    #[cfg(feature = "defmt")]
                    defmt::warn!("Transfer canceled by sender");
                    return Err(TransferError::Canceled);
                }
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn receive_packet<B: BlockStorage>(
        &mut self,
        session: &mut Session<'_, B>,
        size: PacketSize,
        mode: IntegrityMode,
    ) -> Result<RxState, TransferError<B::Error>> {
        let packet_len = size.packet_len(mode);
        while self.buf.len() < packet_len {
            match self.stream.read_byte(self.config.byte_timeout_ms) {
                Some(byte) => {
                    let _ = self.buf.push(byte);
                }
                None => {
                    #[cfg(feature = "defmt")]
                    defmt::debug!("Timeout after {} of {} bytes", self.buf.len(), packet_len);
                    return Ok(RxState::Rejecting { mode });
                }
            }
        }

        match packet::validate(&self.buf, session.seq(), mode) {
            Validation::Accepted => {
                let payload = match packet::payload(&self.buf) {
                    Some(payload) => payload,
                    None => return Ok(RxState::Rejecting { mode }),
                };
                if let Err(e) = session.write_payload(payload) {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("Storage write failed on packet {}", session.seq());
                    send_cancel(&mut self.stream);
                    return Err(e);
                }
                session.advance(size.payload_len());
                self.stream.write_byte(ACK);
                Ok(RxState::Synchronized { mode, attempt: 0 })
            }
            Validation::DuplicateOfPrevious => {
                #[cfg(feature = "defmt")]
                defmt::debug!("Duplicate of packet {}, re-acknowledging", self.buf[1]);
                if session.record_failure(self.config.max_retries) {
                    return Err(self.abort(TransferError::TooManyRetries));
                }
                self.stream.write_byte(ACK);
                Ok(RxState::Synchronized { mode, attempt: 0 })
            }
            Validation::Rejected => Ok(RxState::Rejecting { mode }),
        }
    }

    fn reject<B: BlockStorage>(
        &mut self,
        session: &mut Session<'_, B>,
        mode: IntegrityMode,
    ) -> Result<RxState, TransferError<B::Error>> {
        #[cfg(feature = "defmt")]
        defmt::debug!("Rejecting packet {} (failure {})", session.seq(), session.failures() + 1);
        if session.record_failure(self.config.max_retries) {
            return Err(self.abort(TransferError::TooManyRetries));
        }
        flush_input(&mut self.stream, self.config.flush_timeout_ms);
        self.stream.write_byte(NAK);
        Ok(RxState::Synchronized { mode, attempt: 0 })
    }

    /// Flush, send the cancel burst and hand back `err`
    fn abort<E>(&mut self, err: TransferError<E>) -> TransferError<E> {
        #[cfg(feature = "defmt")]
        defmt::warn!("Receive aborted: code {}", err.code());
        flush_input(&mut self.stream, self.config.flush_timeout_ms);
        send_cancel(&mut self.stream);
        err
    }
}
