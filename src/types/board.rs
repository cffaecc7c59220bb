//! Board profile registry.
//!
//! Maps the identifier string a board returns to the `WHORU` handshake
//! onto its sampling rate and channel count. The registry is fixed at
//! compile time; an identifier that is not listed here is rejected at
//! discovery and never reaches the acquisition core.

use serde::Serialize;

use crate::protocol::HEADER_LENGTH;

/// Static profile for one supported acquisition board.
///
/// Looked up once at connection time and immutable for the life of the
/// session. The packet layout and ADC midpoint are derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoardProfile {
    /// Identifier string the board returns to `WHORU`.
    pub id: &'static str,

    /// Nominal sampling rate in samples per second.
    pub sampling_rate: u32,

    /// Number of EXG channels in each packet.
    pub channel_count: u16,
}

/// All boards the acquisition core knows how to talk to.
pub const SUPPORTED_BOARDS: &[BoardProfile] = &[
    BoardProfile { id: "UNO-R3", sampling_rate: 250, channel_count: 6 },
    BoardProfile { id: "UNO-CLONE", sampling_rate: 250, channel_count: 6 },
    BoardProfile { id: "GENUINO-UNO", sampling_rate: 250, channel_count: 6 },
    BoardProfile { id: "UNO-R4", sampling_rate: 500, channel_count: 6 },
    BoardProfile { id: "RPI-PICO-RP2040", sampling_rate: 500, channel_count: 3 },
    BoardProfile { id: "NANO-CLONE", sampling_rate: 250, channel_count: 8 },
    BoardProfile { id: "NANO-CLASSIC", sampling_rate: 250, channel_count: 8 },
    BoardProfile { id: "STM32F4-BLACK-PILL", sampling_rate: 500, channel_count: 8 },
    BoardProfile { id: "STM32G4-CORE-BOARD", sampling_rate: 500, channel_count: 16 },
    BoardProfile { id: "MEGA-2560-R3", sampling_rate: 250, channel_count: 16 },
    BoardProfile { id: "MEGA-2560-CLONE", sampling_rate: 250, channel_count: 16 },
    BoardProfile { id: "GIGA-R1", sampling_rate: 500, channel_count: 6 },
    BoardProfile { id: "NPG-LITE", sampling_rate: 500, channel_count: 3 },
];

impl BoardProfile {
    /// Look up a board by the identifier it returned to the handshake.
    pub fn lookup(id: &str) -> Option<&'static BoardProfile> {
        SUPPORTED_BOARDS.iter().find(|profile| profile.id == id)
    }

    /// Total packet length for this board:
    /// two bytes per channel plus the header and the end byte.
    pub fn packet_length(&self) -> usize {
        2 * self.channel_count as usize + HEADER_LENGTH + 1
    }

    /// ADC full-scale value: the UNO-R3 family samples at 10-bit
    /// resolution, every other board at 14-bit.
    pub fn adc_full_scale(&self) -> u32 {
        if self.id == "UNO-R3" { 1 << 10 } else { 1 << 14 }
    }

    /// Midpoint the inversion reflects channel values around.
    pub fn midpoint(&self) -> f32 {
        (self.adc_full_scale() - 1) as f32 / 2.0
    }
}
