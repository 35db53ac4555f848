//! Test doubles for the byte-stream and block-storage ports

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sectorlink_hal::{BlockStorage, ByteStream, OpenMode};
use sectorlink_xmodem::packet::{ACK, CAN, EOT, FILL, NAK};
use sectorlink_xmodem::{encode, IntegrityMode, PacketSize, XmodemConfig};

/// Byte stream that replays a fixed script
///
/// Each script entry answers one `read_byte` call: `Some(b)` delivers a
/// byte, `None` is one expired wait. Once the script runs out every read
/// times out. Everything written is recorded.
#[derive(Debug, Default)]
pub struct ScriptedLink {
    inbound: VecDeque<Option<u8>>,
    pub sent: Vec<u8>,
    pub reads: usize,
}

impl ScriptedLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn byte(mut self, byte: u8) -> Self {
        self.inbound.push_back(Some(byte));
        self
    }

    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        self.inbound.extend(bytes.iter().map(|&b| Some(b)));
        self
    }

    pub fn silence(mut self) -> Self {
        self.inbound.push_back(None);
        self
    }

    pub fn silences(mut self, count: usize) -> Self {
        for _ in 0..count {
            self.inbound.push_back(None);
        }
        self
    }

    /// Script entries not yet consumed
    pub fn remaining(&self) -> usize {
        self.inbound.len()
    }

    pub fn count_sent(&self, byte: u8) -> usize {
        self.sent.iter().filter(|&&b| b == byte).count()
    }
}

impl ByteStream for ScriptedLink {
    fn read_byte(&mut self, _timeout_ms: u32) -> Option<u8> {
        self.reads += 1;
        self.inbound.pop_front().flatten()
    }

    fn write_byte(&mut self, byte: u8) {
        self.sent.push(byte);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemError {
    Exists,
    NotFound,
    ReadFailed,
    WriteFailed,
    CloseFailed,
}

#[derive(Debug)]
pub struct MemHandle {
    name: String,
    pos: usize,
}

/// In-memory filesystem with fault injection
#[derive(Debug, Default)]
pub struct MemStorage {
    pub files: HashMap<String, Vec<u8>>,
    pub opens: usize,
    pub closes: usize,
    pub writes: usize,
    /// Largest read served at once
    pub max_read: Option<usize>,
    /// Largest write accepted at once
    pub max_write: Option<usize>,
    /// Fail the n-th write call (0-based)
    pub fail_write_at: Option<usize>,
    /// Accept nothing from the n-th write call on (0-based)
    pub full_at: Option<usize>,
    pub fail_read: bool,
    pub fail_close: bool,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(name: &str, data: &[u8]) -> Self {
        let mut storage = Self::default();
        storage.files.insert(name.to_string(), data.to_vec());
        storage
    }

    pub fn file(&self, name: &str) -> &[u8] {
        self.files.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl BlockStorage for MemStorage {
    type Handle = MemHandle;
    type Error = MemError;

    fn open(&mut self, name: &str, mode: OpenMode) -> Result<MemHandle, MemError> {
        let exists = self.files.contains_key(name);
        if mode.is_write() {
            if exists {
                return Err(MemError::Exists);
            }
            self.files.insert(name.to_string(), Vec::new());
        } else if !exists {
            return Err(MemError::NotFound);
        }
        self.opens += 1;
        Ok(MemHandle {
            name: name.to_string(),
            pos: 0,
        })
    }

    fn read(&mut self, handle: &mut MemHandle, buf: &mut [u8]) -> Result<usize, MemError> {
        if self.fail_read {
            return Err(MemError::ReadFailed);
        }
        let data = self.files.get(&handle.name).ok_or(MemError::NotFound)?;
        let available = &data[handle.pos.min(data.len())..];
        let limit = self.max_read.unwrap_or(usize::MAX);
        let n = available.len().min(buf.len()).min(limit);
        buf[..n].copy_from_slice(&available[..n]);
        handle.pos += n;
        Ok(n)
    }

    fn write(&mut self, handle: &mut MemHandle, buf: &[u8]) -> Result<usize, MemError> {
        let call = self.writes;
        self.writes += 1;
        if self.fail_write_at == Some(call) {
            return Err(MemError::WriteFailed);
        }
        if self.full_at.is_some_and(|at| call >= at) {
            return Ok(0);
        }
        let limit = self.max_write.unwrap_or(usize::MAX);
        let n = buf.len().min(limit);
        let data = self.files.get_mut(&handle.name).ok_or(MemError::NotFound)?;
        data.extend_from_slice(&buf[..n]);
        handle.pos += n;
        Ok(n)
    }

    fn close(&mut self, _handle: MemHandle) -> Result<(), MemError> {
        self.closes += 1;
        if self.fail_close {
            return Err(MemError::CloseFailed);
        }
        Ok(())
    }
}

/// One end of an in-process serial link
pub struct PipeEnd {
    tx: Sender<u8>,
    rx: Receiver<u8>,
    /// Copy of every byte this end wrote
    pub tap: Arc<Mutex<Vec<u8>>>,
    /// Indices (among written ACK bytes) to drop on the floor
    drop_acks: Vec<usize>,
    acks_written: usize,
}

impl PipeEnd {
    /// Lose the n-th ACK this end sends (0-based)
    pub fn drop_ack(mut self, index: usize) -> Self {
        self.drop_acks.push(index);
        self
    }
}

impl ByteStream for PipeEnd {
    fn read_byte(&mut self, timeout_ms: u32) -> Option<u8> {
        self.rx
            .recv_timeout(Duration::from_millis(u64::from(timeout_ms)))
            .ok()
    }

    fn write_byte(&mut self, byte: u8) {
        if byte == ACK {
            let index = self.acks_written;
            self.acks_written += 1;
            if self.drop_acks.contains(&index) {
                return;
            }
        }
        self.tap.lock().unwrap().push(byte);
        let _ = self.tx.send(byte);
    }
}

/// Lossless full-duplex link between two ends
pub fn pipe() -> (PipeEnd, PipeEnd) {
    let (a_tx, b_rx) = channel();
    let (b_tx, a_rx) = channel();
    let end = |tx, rx| PipeEnd {
        tx,
        rx,
        tap: Arc::new(Mutex::new(Vec::new())),
        drop_acks: Vec::new(),
        acks_written: 0,
    };
    (end(a_tx, a_rx), end(b_tx, b_rx))
}

/// Timing for in-process links where the peer answers immediately
pub fn fast_config() -> XmodemConfig {
    XmodemConfig::default().with_timeouts(200, 500, 20)
}

/// Deterministic test data
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + i / 251) as u8).collect()
}

/// `data` padded with fill bytes to a whole number of packets
pub fn padded(data: &[u8], size: PacketSize) -> Vec<u8> {
    let mut out = data.to_vec();
    let payload = size.payload_len();
    let rem = out.len() % payload;
    if rem != 0 {
        out.resize(out.len() + payload - rem, FILL);
    }
    out
}

/// Encode `data` as consecutive packets starting at sequence 1
pub fn packets(data: &[u8], size: PacketSize, mode: IntegrityMode) -> Vec<Vec<u8>> {
    data.chunks(size.payload_len())
        .enumerate()
        .map(|(i, chunk)| {
            encode((i + 1) as u8, chunk, size, mode)
                .unwrap()
                .to_vec()
        })
        .collect()
}

/// Split a captured sender stream into data packets, stopping at EOT
pub fn split_packets(stream: &[u8], mode: IntegrityMode) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    let mut pos = 0;
    while pos < stream.len() {
        match PacketSize::from_header(stream[pos]) {
            Some(size) => {
                let len = size.packet_len(mode);
                out.push(stream[pos..pos + len].to_vec());
                pos += len;
            }
            None if stream[pos] == EOT => break,
            None => pos += 1,
        }
    }
    out
}

pub const CRC_PROBE: u8 = b'C';
pub const CANCEL: [u8; 3] = [CAN, CAN, CAN];
pub const CHECKSUM_PROBE: u8 = NAK;
