//! Packet framer: locates and validates packets in the raw byte stream.

use tracing::trace;

use super::{END_BYTE, Packet, SYNC_BYTE_1, SYNC_BYTE_2};

/// Counters describing how much resynchronization the framer has done.
///
/// Framing corruption is never an error, only observable here and in
/// the throughput telemetry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramerStats {
    /// False sync matches skipped one byte at a time.
    pub resyncs: u64,

    /// Total bytes dropped, including whole-buffer clears when no sync
    /// marker was present.
    pub discarded_bytes: u64,
}

/// Extracts fixed-length packets from a caller-owned byte buffer.
///
/// The framer never owns the buffer; the acquisition loop appends raw
/// transport bytes and calls [`PacketFramer::next_packet`] until it
/// reports none, which drains every complete packet currently resident.
///
/// Recovery policy when a candidate fails validation: drop a single
/// byte past the false sync match and search again. Every internal
/// iteration either returns or shrinks the buffer by at least one byte,
/// so the search always terminates.
#[derive(Debug)]
pub struct PacketFramer {
    packet_length: usize,
    stats: FramerStats,
}

impl PacketFramer {
    /// Create a framer for the session's fixed packet length.
    pub fn new(packet_length: usize) -> Self {
        Self { packet_length, stats: FramerStats::default() }
    }

    /// Packet length this framer was configured with.
    pub fn packet_length(&self) -> usize {
        self.packet_length
    }

    /// Resynchronization counters accumulated so far.
    pub fn stats(&self) -> FramerStats {
        self.stats
    }

    /// Try to extract one complete, valid packet from `buffer`.
    ///
    /// Returns `None` when no complete packet is currently available.
    /// Buffers shorter than one packet are left untouched until more
    /// bytes arrive; longer buffers with no sync marker anywhere are
    /// cleared wholesale, since nothing in them can start a packet.
    pub fn next_packet(&mut self, buffer: &mut Vec<u8>) -> Option<Packet> {
        while buffer.len() >= self.packet_length {
            let sync_index = match find_sync(buffer) {
                Some(index) => index,
                None => {
                    self.stats.discarded_bytes += buffer.len() as u64;
                    trace!(dropped = buffer.len(), "no sync marker, clearing buffer");
                    buffer.clear();
                    return None;
                }
            };

            if buffer.len() < sync_index + self.packet_length {
                // Partial packet: wait for more bytes, discard nothing.
                return None;
            }

            let end = sync_index + self.packet_length;
            if buffer[end - 1] == END_BYTE {
                let packet: Vec<u8> = buffer[sync_index..end].to_vec();
                self.stats.discarded_bytes += sync_index as u64;
                buffer.drain(..end);
                return Some(Packet::from_validated(packet));
            }

            // False sync match: drop one byte past it and retry so a
            // genuine packet straddling this position is not lost.
            self.stats.resyncs += 1;
            self.stats.discarded_bytes += (sync_index + 1) as u64;
            trace!(sync_index, "bad end byte, resynchronizing");
            buffer.drain(..=sync_index);
        }
        None
    }
}

/// Find the first occurrence of the two-byte sync marker.
fn find_sync(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|pair| pair == [SYNC_BYTE_1, SYNC_BYTE_2])
}
