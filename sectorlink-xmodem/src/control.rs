//! Single-byte control exchanges shared by both roles

use sectorlink_hal::ByteStream;

use crate::config::CANCEL_BURST;
use crate::packet::{CAN, MAX_PACKET_SIZE};

/// Upper bound on bytes discarded by one flush
///
/// A peer that never stops talking cannot hold the engine in a flush.
pub const MAX_FLUSH_BYTES: usize = 4 * MAX_PACKET_SIZE;

/// Discard input until the line has been quiet for `quiet_ms`
///
/// Returns the number of bytes discarded.
pub fn flush_input<S: ByteStream>(stream: &mut S, quiet_ms: u32) -> usize {
    let mut discarded = 0;
    while discarded < MAX_FLUSH_BYTES && stream.read_byte(quiet_ms).is_some() {
        discarded += 1;
    }
    discarded
}

/// Tell the peer we are aborting
pub fn send_cancel<S: ByteStream>(stream: &mut S) {
    stream.write_all(&[CAN; CANCEL_BURST]);
}

/// After one CAN, check whether a second follows within `timeout_ms`
///
/// A lone CAN is treated as line noise.
pub fn confirm_cancel<S: ByteStream>(stream: &mut S, timeout_ms: u32) -> bool {
    stream.read_byte(timeout_ms) == Some(CAN)
}
