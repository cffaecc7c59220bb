//! Serial acquisition library for BioAmp EXG boards.
//!
//! ChordLink connects to an Arduino-compatible biosignal board over a
//! serial port, identifies it, and streams decoded multi-channel
//! samples to CSV files, in-process subscribers, and (optionally) a
//! Lab Streaming Layer outlet.
//!
//! # Features
//!
//! - **Auto-detection**: scans serial ports and baud rates for a board
//! - **Self-healing framing**: resynchronizes through serial corruption
//! - **Loss accounting**: counter gaps become missing-sample totals
//! - **Rate telemetry**: per-second throughput and long-window drift
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use chordlink::{AcquisitionSession, ChordLink, SessionConfig, SinkSet};
//! use tokio_util::sync::CancellationToken;
//!
//! fn main() -> chordlink::Result<()> {
//!     let device = ChordLink::detect()?;
//!     let mut session = AcquisitionSession::new(
//!         device.transport,
//!         device.profile,
//!         SessionConfig::default(),
//!         SinkSet::new(),
//!         CancellationToken::new(),
//!     );
//!     let summary = session.run()?;
//!     println!("decoded {} packets", summary.packets_decoded);
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Acquisition pipeline
pub mod discovery;
pub mod protocol;
pub mod session;
pub mod telemetry;
pub mod transport;

// Output side
pub mod sink;
pub mod stream;

// Core exports
pub use error::*;
pub use types::*;

// Pipeline exports
pub use discovery::DetectedDevice;
pub use protocol::{PacketFramer, SampleDecoder};
pub use session::{AcquisitionSession, SessionConfig, SessionState, SessionSummary};
pub use transport::SerialTransport;

// Output exports
pub use sink::{CsvRecorder, LiveStreamSink, SampleSink, SinkSet};
#[cfg(feature = "lsl")]
pub use sink::LslSink;
pub use stream::ThrottleExt;

/// Unified entry point for board connections.
///
/// A thin factory over the [`discovery`] module for the two common
/// ways of getting a device: a known port, or a scan.
///
/// # Examples
///
/// ```rust,no_run
/// use chordlink::ChordLink;
///
/// fn main() -> chordlink::Result<()> {
///     // Known port at the default baud rate.
///     let device = ChordLink::connect("/dev/ttyUSB0", None)?;
///     println!("found {} on {}", device.profile.id, device.port_name);
///     Ok(())
/// }
/// ```
pub struct ChordLink;

impl ChordLink {
    /// Connect to a board on a specific port.
    ///
    /// Uses the first candidate baud rate when none is given.
    pub fn connect(port: &str, baud_rate: Option<u32>) -> Result<DetectedDevice> {
        discovery::connect_or_detect(Some(port), baud_rate)
    }

    /// Scan all serial ports for a compatible board.
    pub fn detect() -> Result<DetectedDevice> {
        discovery::connect_or_detect(None, None)
    }
}
