//! Test utilities: synthetic packet encoding and a scripted transport.
//!
//! Shared by unit tests across the crate and by the framer benchmark
//! (which is why this module is also compiled under the `benchmark`
//! feature).

#![cfg(any(test, feature = "benchmark"))]

use std::collections::VecDeque;

use crate::error::{AcquisitionError, Result};
use crate::protocol::{END_BYTE, SYNC_BYTE_1, SYNC_BYTE_2};
use crate::transport::Transport;

/// Encode one wire packet with the given counter and channel words.
pub fn encode_packet(counter: u8, channels: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(2 * channels.len() + 4);
    bytes.push(SYNC_BYTE_1);
    bytes.push(SYNC_BYTE_2);
    bytes.push(counter);
    for value in channels {
        bytes.extend_from_slice(&value.to_be_bytes());
    }
    bytes.push(END_BYTE);
    bytes
}

enum ReadStep {
    Bytes(Vec<u8>),
    Error,
}

/// Scripted [`Transport`] for tests.
///
/// Each `read_available` call consumes one queued step; an exhausted
/// script behaves like a quiet device (zero-byte timeout reads).
/// Scripted steps survive `clear_io_buffers` so command exchanges in
/// the middle of a script don't eat the remaining test data.
pub struct MockTransport {
    reads: VecDeque<ReadStep>,
    lines: VecDeque<String>,
    written: Vec<u8>,
    clears: usize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self { reads: VecDeque::new(), lines: VecDeque::new(), written: Vec::new(), clears: 0 }
    }

    /// Queue bytes to be returned by one `read_available` call.
    pub fn queue_bytes(&mut self, bytes: &[u8]) {
        self.reads.push_back(ReadStep::Bytes(bytes.to_vec()));
    }

    /// Queue a zero-byte read (device quiet for one poll).
    pub fn queue_silence(&mut self) {
        self.reads.push_back(ReadStep::Bytes(Vec::new()));
    }

    /// Queue a fatal transport error.
    pub fn queue_read_error(&mut self) {
        self.reads.push_back(ReadStep::Error);
    }

    /// Queue one handshake reply line.
    pub fn queue_line(&mut self, line: &str) {
        self.lines.push_back(line.to_string());
    }

    /// Everything the code under test has written so far.
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Number of `START` commands written so far.
    pub fn start_commands(&self) -> usize {
        count_tokens(&self.written, b"START\n")
    }

    /// Number of `STOP` commands written so far.
    pub fn stop_commands(&self) -> usize {
        count_tokens(&self.written, b"STOP\n")
    }

    /// How many times the I/O buffers were cleared.
    pub fn clear_count(&self) -> usize {
        self.clears
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn count_tokens(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|window| *window == needle).count()
}

impl Transport for MockTransport {
    fn read_available(&mut self, buf: &mut Vec<u8>) -> Result<usize> {
        match self.reads.pop_front() {
            Some(ReadStep::Bytes(bytes)) => {
                buf.extend_from_slice(&bytes);
                Ok(bytes.len())
            }
            Some(ReadStep::Error) => Err(AcquisitionError::transport(
                "read",
                std::io::Error::other("scripted transport failure"),
            )),
            None => Ok(0),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.written.extend_from_slice(bytes);
        Ok(())
    }

    fn read_line(&mut self) -> Result<String> {
        Ok(self.lines.pop_front().unwrap_or_default())
    }

    fn clear_io_buffers(&mut self) -> Result<()> {
        self.clears += 1;
        Ok(())
    }
}
