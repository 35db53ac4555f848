//! Sending side of an XMODEM transfer
//!
//! The transmitter waits for the receiver's probe to learn the integrity
//! mode, then sends one packet at a time and retransmits until it is
//! acknowledged. End of file is signalled with EOT.
//!
//! ```text
//! AwaitNegotiation ── 'C' / NAK ──▶ SendPacket ──▶ AwaitAck ── ACK ──┐
//!                                       ▲              │ NAK/timeout │
//!                                       │              └──(resend)───┤
//!                                       └────────────────────────────┘
//!                          (no more data) ──▶ EotHandshake ── ACK ──▶ Done
//! ```

use sectorlink_hal::{BlockStorage, ByteStream};

use crate::config::XmodemConfig;
use crate::control::{confirm_cancel, flush_input, send_cancel};
use crate::error::{TransferError, TransferOutcome};
use crate::integrity::IntegrityMode;
use crate::packet::{Packet, ACK, CAN, EOT, MAX_PACKET_SIZE};
use crate::session::Session;

/// Largest payload chunk read from storage
const MAX_CHUNK: usize = 1024;

/// Transmitter states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxState {
    /// Waiting for the receiver's mode probe
    AwaitNegotiation { attempt: u8 },
    /// Load and frame the next chunk
    SendPacket { mode: IntegrityMode },
    /// Packet framed; transmit it and wait for the verdict
    AwaitAck { mode: IntegrityMode, len: usize },
    /// All data sent and acknowledged; closing the transfer
    EotHandshake { attempt: u8 },
    /// Transfer complete with this many file bytes sent
    Done(u32),
}

impl TxState {
    /// Initial state
    pub const fn start() -> Self {
        TxState::AwaitNegotiation { attempt: 0 }
    }
}

/// XMODEM transmitter
pub struct Transmitter<S> {
    stream: S,
    config: XmodemConfig,
    packet: [u8; MAX_PACKET_SIZE],
    packet_len: usize,
}

impl<S: ByteStream> Transmitter<S> {
    /// Create a transmitter over a byte stream
    pub fn new(stream: S, config: XmodemConfig) -> Self {
        Self {
            stream,
            config,
            packet: [0; MAX_PACKET_SIZE],
            packet_len: 0,
        }
    }

    /// Release the byte stream
    pub fn into_stream(self) -> S {
        self.stream
    }

    /// Send the whole file behind the session's storage handle
    ///
    /// Returns the number of file bytes sent, not counting padding.
    pub fn run<B: BlockStorage>(&mut self, session: &mut Session<'_, B>) -> TransferOutcome<B::Error> {
        let mut state = TxState::start();
        loop {
            state = self.step(session, state)?;
            if let TxState::Done(bytes) = state {
                return Ok(bytes);
            }
        }
    }

    /// Perform one state transition
    pub fn step<B: BlockStorage>(
        &mut self,
        session: &mut Session<'_, B>,
        state: TxState,
    ) -> Result<TxState, TransferError<B::Error>> {
        match state {
            TxState::AwaitNegotiation { attempt } => self.await_negotiation(session, attempt),
            TxState::SendPacket { mode } => self.load_packet(session, mode),
            TxState::AwaitAck { mode, len } => self.await_ack(session, mode, len),
            TxState::EotHandshake { attempt } => self.finish(session, attempt),
            TxState::Done(bytes) => Ok(TxState::Done(bytes)),
        }
    }

    fn await_negotiation<B: BlockStorage>(
        &mut self,
        session: &mut Session<'_, B>,
        attempt: u8,
    ) -> Result<TxState, TransferError<B::Error>> {
        if attempt >= self.config.max_negotiation_attempts {
            return Err(self.abort(TransferError::Sync));
        }

        match self.stream.read_byte(self.config.negotiation_timeout_ms) {
            Some(CAN) => {
                if confirm_cancel(&mut self.stream, self.config.byte_timeout_ms) {
                    return Err(self.canceled());
                }
            }
            Some(byte) => {
                if let Some(mode) = IntegrityMode::from_probe(byte) {
                    let mode = session.negotiate(mode);
                    #[cfg(feature = "defmt")]
                    defmt::info!("Receiver requested {:?}", mode);
                    return Ok(TxState::SendPacket { mode });
                }
            }
            None => {}
        }
        Ok(TxState::AwaitNegotiation {
            attempt: attempt + 1,
        })
    }

    fn load_packet<B: BlockStorage>(
        &mut self,
        session: &mut Session<'_, B>,
        mode: IntegrityMode,
    ) -> Result<TxState, TransferError<B::Error>> {
        let size = self.config.packet_size;
        let mut chunk = [0u8; MAX_CHUNK];
        let chunk = &mut chunk[..size.payload_len()];

        let len = match session.read_chunk(chunk) {
            Ok(len) => len,
            Err(e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("Storage read failed before packet {}", session.seq());
                send_cancel(&mut self.stream);
                return Err(e);
            }
        };
        if len == 0 {
            return Ok(TxState::EotHandshake { attempt: 0 });
        }

        let packet = Packet::new(session.seq(), &chunk[..len], size)?;
        self.packet_len = packet.encode(mode, &mut self.packet)?;
        Ok(TxState::AwaitAck { mode, len })
    }

    fn await_ack<B: BlockStorage>(
        &mut self,
        session: &mut Session<'_, B>,
        mode: IntegrityMode,
        len: usize,
    ) -> Result<TxState, TransferError<B::Error>> {
        self.stream.write_all(&self.packet[..self.packet_len]);

        match self.stream.read_byte(self.config.byte_timeout_ms) {
            Some(ACK) => {
                session.advance(len);
                return Ok(TxState::SendPacket { mode });
            }
            Some(CAN) => {
                if confirm_cancel(&mut self.stream, self.config.byte_timeout_ms) {
                    return Err(self.canceled());
                }
            }
            // NAK, noise and silence all mean "send it again"
            _ => {}
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("Retransmitting packet {} (attempt {})", session.seq(), session.failures() + 2);
        if session.record_failure(self.config.max_retries) {
            return Err(self.abort(TransferError::TooManyRetries));
        }
        Ok(TxState::AwaitAck { mode, len })
    }

    fn finish<B: BlockStorage>(
        &mut self,
        session: &mut Session<'_, B>,
        attempt: u8,
    ) -> Result<TxState, TransferError<B::Error>> {
        if attempt >= self.config.max_eot_attempts {
            flush_input(&mut self.stream, self.config.flush_timeout_ms);
            #[cfg(feature = "defmt")]
            defmt::warn!("EOT never acknowledged");
            return Err(TransferError::EotUnacknowledged);
        }

        self.stream.write_byte(EOT);
        if self.stream.read_byte(self.config.negotiation_timeout_ms) == Some(ACK) {
            flush_input(&mut self.stream, self.config.flush_timeout_ms);
            #[cfg(feature = "defmt")]
            defmt::info!("Transfer complete, {} bytes sent", session.bytes());
            return Ok(TxState::Done(session.bytes()));
        }
        Ok(TxState::EotHandshake {
            attempt: attempt + 1,
        })
    }

    /// Acknowledge the peer's cancel and drain the line
    fn canceled<E>(&mut self) -> TransferError<E> {
        self.stream.write_byte(ACK);
        flush_input(&mut self.stream, self.config.flush_timeout_ms);
        #[cfg(feature = "defmt")]
        defmt::warn!("Transfer canceled by receiver");
        TransferError::Canceled
    }

    /// Send the cancel burst, drain the line and hand back `err`
    fn abort<E>(&mut self, err: TransferError<E>) -> TransferError<E> {
        #[cfg(feature = "defmt")]
        defmt::warn!("Send aborted: code {}", err.code());
        send_cancel(&mut self.stream);
        flush_input(&mut self.stream, self.config.flush_timeout_ms);
        err
    }
}
