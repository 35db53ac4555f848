//! XMODEM / XMODEM-1K File Transfer
//!
//! This crate moves one file at a time between a terminal program and the
//! device's flash filesystem over a plain serial line. It is the only part
//! of the system with real failure handling: timeouts, retransmission
//! budgets, duplicate detection, integrity checks and cooperative
//! cancellation.
//!
//! # Protocol Overview
//!
//! Data travels in fixed-size packets acknowledged one at a time:
//! ```text
//! ┌────────┬─────┬─────────┬───────────────┬──────────────┐
//! │ SOH/STX│ SEQ │ 255-SEQ │ 128B / 1024B  │ SUM or CRC16 │
//! └────────┴─────┴─────────┴───────────────┴──────────────┘
//! ```
//!
//! The receiver opens with `'C'` (CRC16) or NAK (checksum); the sender
//! answers with packet 1. ACK advances, NAK or silence retransmits, EOT
//! ends the file and a double CAN cancels from either side.
//!
//! The engine is synchronous: every call blocks until the transfer ends,
//! and every wait is bounded by a timeout from [`XmodemConfig`].
//!
//! # Entry points
//!
//! - [`receive_file`] / [`send_file`] - open, transfer, close
//! - [`Receiver`] / [`Transmitter`] - the state machines, for callers that
//!   manage the [`Session`] themselves

#![no_std]
#![deny(unsafe_code)]

pub mod config;
pub mod control;
pub mod error;
pub mod integrity;
pub mod packet;
pub mod receiver;
pub mod session;
pub mod transfer;
pub mod transmitter;

pub use config::XmodemConfig;
pub use error::{outcome_code, TransferError, TransferOutcome};
pub use integrity::IntegrityMode;
pub use packet::{encode, validate, Packet, PacketError, PacketSize, Validation};
pub use receiver::{Receiver, RxState};
pub use session::{Role, Session};
pub use transfer::{receive_file, send_file};
pub use transmitter::{Transmitter, TxState};
