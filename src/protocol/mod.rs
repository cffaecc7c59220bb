//! Wire protocol: packet framing and sample decoding.
//!
//! Boards stream fixed-length packets over the serial link:
//!
//! ```text
//! [SYNC1][SYNC2][COUNTER][CH0_HI][CH0_LO]...[CHn_HI][CHn_LO][END]
//! ```
//!
//! - `SYNC1 SYNC2` (`0xC7 0x7C`) marks the start of a packet
//! - `COUNTER` is a sequence counter wrapping mod 256, used to infer
//!   lost samples
//! - each channel is a 16-bit unsigned value, high byte first
//! - `END` (`0x01`) closes the packet
//!
//! The total length is fixed per session at
//! `2 * channel_count + HEADER_LENGTH + 1` bytes, derived from the
//! connected board's profile.
//!
//! Framing is self-healing: the framer resynchronizes on the sync pair
//! and discards corrupt runs one byte at a time, so garbage on the wire
//! costs throughput but never aborts acquisition.

mod decoder;
mod framer;

pub use decoder::{DecodeOutcome, SampleDecoder};
pub use framer::{FramerStats, PacketFramer};

/// First byte of the packet sync marker.
pub const SYNC_BYTE_1: u8 = 0xC7;

/// Second byte of the packet sync marker.
pub const SYNC_BYTE_2: u8 = 0x7C;

/// Packet terminator byte.
pub const END_BYTE: u8 = 0x01;

/// Header bytes preceding the channel data: sync pair plus counter.
pub const HEADER_LENGTH: usize = 3;

/// One validated, fixed-length packet sliced out of the byte stream.
///
/// Only the framer constructs these, so holding a `Packet` guarantees
/// the sync pair, length and end byte have already been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    bytes: Vec<u8>,
}

impl Packet {
    /// Wrap bytes the framer has already validated.
    pub(crate) fn from_validated(bytes: Vec<u8>) -> Self {
        debug_assert!(bytes.len() >= HEADER_LENGTH + 1);
        debug_assert_eq!(bytes[0], SYNC_BYTE_1);
        debug_assert_eq!(bytes[1], SYNC_BYTE_2);
        debug_assert_eq!(*bytes.last().unwrap(), END_BYTE);
        Self { bytes }
    }

    /// Sequence counter byte.
    pub fn counter(&self) -> u8 {
        self.bytes[2]
    }

    /// Number of channels carried by this packet.
    pub fn channel_count(&self) -> usize {
        (self.bytes.len() - HEADER_LENGTH - 1) / 2
    }

    /// 16-bit channel word, high byte first.
    pub fn channel_word(&self, channel: usize) -> u16 {
        let high = self.bytes[2 * channel + HEADER_LENGTH];
        let low = self.bytes[2 * channel + HEADER_LENGTH + 1];
        (high as u16) << 8 | low as u16
    }

    /// Raw packet bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
