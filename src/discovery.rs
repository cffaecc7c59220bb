//! Device discovery: port scanning and the board identification
//! handshake.
//!
//! A candidate port is probed by sending `WHORU` and looking the reply
//! up in the board registry, retrying a few times because the firmware
//! may still be mid-boot or mid-stream when the query lands. Unknown
//! identifiers never get past this module.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{AcquisitionError, Result};
use crate::transport::{Command, DEFAULT_READ_TIMEOUT, SerialTransport, Transport, send_command};
use crate::types::BoardProfile;

/// Baud rates probed, in order, when the user does not force one.
pub const CANDIDATE_BAUD_RATES: [u32; 2] = [230_400, 115_200];

/// `WHORU` attempts per port/baud combination.
const HANDSHAKE_RETRY_LIMIT: u32 = 4;

/// A connected, identified device ready to stream.
pub struct DetectedDevice {
    /// Open transport to the board.
    pub transport: SerialTransport,

    /// Registry profile matching the board's handshake reply.
    pub profile: &'static BoardProfile,

    /// Port the board was found on.
    pub port_name: String,

    /// Baud rate the handshake succeeded at.
    pub baud_rate: u32,
}

/// Identify the board on an already-open transport.
///
/// Retries the `WHORU` query up to the retry limit; replies that are
/// not in the registry (garbled or from foreign hardware) count as a
/// failed attempt.
pub fn handshake(transport: &mut dyn Transport) -> Result<&'static BoardProfile> {
    let mut last_reply = String::new();
    for attempt in 1..=HANDSHAKE_RETRY_LIMIT {
        let reply = send_command(transport, Command::Identify)?;
        if let Some(profile) = BoardProfile::lookup(&reply) {
            return Ok(profile);
        }
        debug!(attempt, reply, "handshake reply not in the board registry");
        last_reply = reply;
    }
    Err(AcquisitionError::UnknownBoard { identifier: last_reply })
}

/// Connect to a specific port and baud rate.
pub fn connect(port_name: &str, baud_rate: u32, timeout: Duration) -> Result<DetectedDevice> {
    let mut transport = SerialTransport::open(port_name, baud_rate, timeout)?;
    let profile = handshake(&mut transport)?;
    info!(
        board = profile.id,
        port = port_name,
        baud_rate,
        sampling_rate = profile.sampling_rate,
        channels = profile.channel_count,
        "board detected"
    );
    Ok(DetectedDevice { transport, profile, port_name: port_name.to_string(), baud_rate })
}

/// Scan all serial ports for a compatible board.
///
/// Tries every available port at each candidate baud rate (or only the
/// forced one). Failures on individual combinations are expected while
/// scanning and only logged; running out of combinations is the fatal
/// [`AcquisitionError::DeviceNotFound`].
pub fn detect(baud_rate: Option<u32>, timeout: Duration) -> Result<DetectedDevice> {
    let ports = serialport::available_ports()
        .map_err(|e| AcquisitionError::port_open("<enumeration>", e.to_string()))?;
    let baud_rates: Vec<u32> =
        baud_rate.map(|b| vec![b]).unwrap_or_else(|| CANDIDATE_BAUD_RATES.to_vec());

    let mut tried = 0;
    for port in &ports {
        for &baud in &baud_rates {
            tried += 1;
            debug!(port = port.port_name, baud, "probing for a board");
            match connect(&port.port_name, baud, timeout) {
                Ok(device) => return Ok(device),
                Err(e) if e.is_retryable() => {
                    debug!(port = port.port_name, baud, error = %e, "probe failed, moving on");
                }
                Err(e) => {
                    warn!(port = port.port_name, baud, error = %e, "probe failed");
                }
            }
        }
    }

    Err(AcquisitionError::DeviceNotFound { ports_tried: tried })
}

/// Connect with the default read timeout, scanning when no port is
/// given.
pub fn connect_or_detect(
    port: Option<&str>,
    baud_rate: Option<u32>,
) -> Result<DetectedDevice> {
    match port {
        Some(port_name) => {
            let baud = baud_rate.unwrap_or(CANDIDATE_BAUD_RATES[0]);
            connect(port_name, baud, DEFAULT_READ_TIMEOUT)
        }
        None => detect(baud_rate, DEFAULT_READ_TIMEOUT),
    }
}
