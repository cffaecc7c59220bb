//! Core types for acquired biosignal data.
//!
//! - [`BoardProfile`] describes a supported board (sampling rate,
//!   channel count) and derives the per-session packet layout
//! - [`DecodedSample`] is one multi-channel sample with its sequence
//!   counter
//! - [`SampleWindow`] is a fixed-size rolling view for live plotting

mod board;
mod sample;

pub use board::{BoardProfile, SUPPORTED_BOARDS};
pub use sample::{DecodedSample, SampleWindow};
