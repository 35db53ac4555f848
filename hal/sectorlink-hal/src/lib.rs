//! SectorLink Hardware Abstraction Layer
//!
//! This crate defines the two ports the transfer engine consumes, plus the
//! tick source needed to put a deadline on every wait. Chip-specific code
//! implements these; the protocol crate only ever sees the traits.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Command layer (rx <file> / sx <file>)  │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  sectorlink-xmodem (protocol engine)    │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  ByteStream   │       │ BlockStorage  │
//! │ (UART + tick) │       │ (flash FS)    │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`uart::ByteStream`] - Half-duplex byte channel with per-byte timeout
//! - [`clock::Monotonic`] - Millisecond tick source
//! - [`storage::BlockStorage`] - File-oriented block storage

#![no_std]
#![deny(unsafe_code)]

#[cfg(feature = "std")]
extern crate std;

pub mod clock;
pub mod storage;
pub mod uart;

// Re-export key traits at crate root for convenience
#[cfg(feature = "std")]
pub use clock::StdClock;
pub use clock::Monotonic;
pub use storage::{BlockStorage, OpenMode};
pub use uart::{ByteStream, TimedUart};
