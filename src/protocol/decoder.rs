//! Sample decoder: packet payload to channel values, with gap tracking.

use tracing::debug;

use super::Packet;
use crate::types::{BoardProfile, DecodedSample};

/// Result of decoding one packet.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOutcome {
    pub sample: DecodedSample,

    /// Samples inferred lost since the previous packet, from the
    /// wrapping counter discontinuity. Zero for a contiguous stream.
    pub gap: u8,
}

/// Converts validated packets into decoded samples.
///
/// Tracks the wrapping sequence counter across packets to infer lost
/// samples and optionally reflects channel values around the board's
/// ADC midpoint to present an inverted-polarity signal without
/// renormalizing amplitude.
///
/// Malformed packets are filtered upstream by the framer and never
/// reach this component, so decoding cannot fail.
#[derive(Debug)]
pub struct SampleDecoder {
    channel_count: usize,
    /// Reflection midpoint when inversion is enabled.
    invert_around: Option<f32>,
    previous_counter: Option<u8>,
    missing_samples: u64,
}

impl SampleDecoder {
    /// Create a decoder for the connected board.
    pub fn new(profile: &BoardProfile, inverted: bool) -> Self {
        Self {
            channel_count: profile.channel_count as usize,
            invert_around: inverted.then(|| profile.midpoint()),
            previous_counter: None,
            missing_samples: 0,
        }
    }

    /// Cumulative count of samples inferred lost this session.
    pub fn missing_samples(&self) -> u64 {
        self.missing_samples
    }

    /// Decode one packet and update the sequence tracker.
    pub fn decode(&mut self, packet: &Packet) -> DecodeOutcome {
        let counter = packet.counter();

        let gap = match self.previous_counter {
            Some(previous) if counter != previous.wrapping_add(1) => {
                // Number of counter values skipped in mod-256 space.
                let gap = counter.wrapping_sub(previous).wrapping_sub(1);
                self.missing_samples += gap as u64;
                debug!(
                    expected = previous.wrapping_add(1),
                    received = counter,
                    missing_total = self.missing_samples,
                    "sequence gap detected"
                );
                gap
            }
            _ => 0,
        };
        self.previous_counter = Some(counter);

        let mut channels = Vec::with_capacity(self.channel_count);
        for channel in 0..self.channel_count {
            let value = packet.channel_word(channel) as f32;
            channels.push(match self.invert_around {
                Some(mid) => reflect(value, mid),
                None => value,
            });
        }

        DecodeOutcome { sample: DecodedSample::new(counter, channels), gap }
    }
}

/// Reflect `value` around `mid`: values above the midpoint land the
/// same distance below it and vice versa; the midpoint is unchanged.
fn reflect(value: f32, mid: f32) -> f32 {
    if value > mid {
        mid - (value - mid).abs()
    } else if value < mid {
        mid + (mid - value).abs()
    } else {
        value
    }
}
