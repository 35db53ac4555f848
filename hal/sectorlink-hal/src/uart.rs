//! Byte-stream port
//!
//! The transfer engine talks to its peer one byte at a time. Every read
//! carries its own timeout so no wait in the protocol is unbounded.

use embedded_io::{Read, ReadReady, Write};

use crate::clock::Monotonic;

/// Half-duplex byte channel with per-byte timeout
pub trait ByteStream {
    /// Wait up to `timeout_ms` for one byte
    ///
    /// Returns `None` when nothing arrived before the deadline.
    fn read_byte(&mut self, timeout_ms: u32) -> Option<u8>;

    /// Send one byte
    fn write_byte(&mut self, byte: u8);

    /// Send a run of bytes in order
    fn write_all(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.write_byte(byte);
        }
    }
}

impl<T: ByteStream + ?Sized> ByteStream for &mut T {
    fn read_byte(&mut self, timeout_ms: u32) -> Option<u8> {
        (**self).read_byte(timeout_ms)
    }

    fn write_byte(&mut self, byte: u8) {
        (**self).write_byte(byte)
    }

    fn write_all(&mut self, bytes: &[u8]) {
        (**self).write_all(bytes)
    }
}

/// Polling byte stream over a serial peripheral
///
/// Wraps any blocking `embedded-io` UART that can report pending RX data
/// and pairs it with a tick source. `read_byte` spins on `read_ready()`
/// until a byte is available or the deadline passes.
pub struct TimedUart<U, C> {
    uart: U,
    clock: C,
}

impl<U, C> TimedUart<U, C>
where
    U: Read + ReadReady + Write,
    C: Monotonic,
{
    /// Create a new timed stream
    pub fn new(uart: U, clock: C) -> Self {
        Self { uart, clock }
    }

    /// Release the underlying peripheral and clock
    pub fn release(self) -> (U, C) {
        (self.uart, self.clock)
    }

    fn poll_byte(&mut self) -> Option<u8> {
        // RX faults (framing, overrun) read as "nothing yet"; the caller's
        // timeout and retry budget handle the loss.
        match self.uart.read_ready() {
            Ok(true) => {
                let mut buf = [0u8; 1];
                match self.uart.read(&mut buf) {
                    Ok(1) => Some(buf[0]),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

impl<U, C> ByteStream for TimedUart<U, C>
where
    U: Read + ReadReady + Write,
    C: Monotonic,
{
    fn read_byte(&mut self, timeout_ms: u32) -> Option<u8> {
        let entry = self.clock.now_ms();
        loop {
            if let Some(byte) = self.poll_byte() {
                return Some(byte);
            }
            if self.clock.elapsed_ms(entry) >= timeout_ms {
                return None;
            }
        }
    }

    fn write_byte(&mut self, byte: u8) {
        if let Err(_e) = self.uart.write_all(&[byte]) {
            #[cfg(feature = "defmt")]
            defmt::warn!("UART write failed: {:?}", defmt::Debug2Format(&_e));
        }
    }

    fn write_all(&mut self, bytes: &[u8]) {
        if let Err(_e) = self.uart.write_all(bytes) {
            #[cfg(feature = "defmt")]
            defmt::warn!("UART write failed: {:?}", defmt::Debug2Format(&_e));
        }
    }
}
