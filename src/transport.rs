//! Byte transport to the device, plus the ASCII command protocol.
//!
//! The acquisition core only needs a duplex byte stream: short-timeout
//! reads, writes, a line reader for handshake replies, and buffer
//! clearing at teardown. [`SerialTransport`] implements that over the
//! `serialport` crate; tests substitute scripted transports.
//!
//! Commands are newline-terminated ASCII tokens (`WHORU`, `START`,
//! `STOP`). The firmware needs a short settle after each command before
//! it replies, so [`send_command`] writes, waits, then reads one line.

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};
use tracing::{debug, trace};

use crate::error::{AcquisitionError, Result};

/// Delay between writing a command and reading the device's reply.
const COMMAND_DELAY: Duration = Duration::from_millis(100);

/// Default per-read timeout for the serial port.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Commands understood by the board firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Handshake query; the board replies with its identifier string.
    Identify,
    /// Begin streaming packets. Idempotent, also used as a keep-alive.
    Start,
    /// Stop streaming.
    Stop,
}

impl Command {
    /// Wire token for this command, without the newline terminator.
    pub fn token(self) -> &'static str {
        match self {
            Command::Identify => "WHORU",
            Command::Start => "START",
            Command::Stop => "STOP",
        }
    }
}

/// Duplex byte stream to an acquisition device.
pub trait Transport: Send {
    /// Read whatever the transport has buffered, or block up to the
    /// configured timeout for at least one byte. Appends to `buf` and
    /// returns the number of bytes read; a timeout reads zero bytes.
    fn read_available(&mut self, buf: &mut Vec<u8>) -> Result<usize>;

    /// Write all bytes.
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Read one newline-terminated line, lossily decoded and trimmed.
    /// Returns an empty string if the timeout elapses first.
    fn read_line(&mut self) -> Result<String>;

    /// Discard any unread input and unsent output.
    fn clear_io_buffers(&mut self) -> Result<()>;
}

/// Send a command and read the device's one-line reply.
///
/// Input and output buffers are cleared first so the reply is not
/// polluted by streamed packet bytes.
pub fn send_command(transport: &mut dyn Transport, command: Command) -> Result<String> {
    transport.clear_io_buffers()?;
    transport.write_all(format!("{}\n", command.token()).as_bytes())?;
    std::thread::sleep(COMMAND_DELAY);
    let reply = transport.read_line()?;
    trace!(command = command.token(), reply, "command exchange");
    Ok(reply)
}

/// [`Transport`] over a serial port.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    port_name: String,
}

impl SerialTransport {
    /// Open `port_name` at `baud_rate` with the given read timeout.
    pub fn open(port_name: &str, baud_rate: u32, timeout: Duration) -> Result<Self> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(timeout)
            .open()
            .map_err(|e| AcquisitionError::port_open(port_name, e.to_string()))?;
        debug!(port = port_name, baud_rate, "serial port opened");
        Ok(Self { port, port_name: port_name.to_string() })
    }

    /// Name of the underlying port.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl Transport for SerialTransport {
    fn read_available(&mut self, buf: &mut Vec<u8>) -> Result<usize> {
        // Read everything already buffered, or wait for a single byte;
        // the timeout keeps the acquisition loop responsive when the
        // device goes quiet.
        let waiting = self
            .port
            .bytes_to_read()
            .map_err(|e| AcquisitionError::transport("bytes_to_read", e.into()))?;
        let want = (waiting as usize).max(1);

        let start = buf.len();
        buf.resize(start + want, 0);
        match self.port.read(&mut buf[start..]) {
            Ok(n) => {
                buf.truncate(start + n);
                Ok(n)
            }
            Err(e) if e.kind() == ErrorKind::TimedOut => {
                buf.truncate(start);
                Ok(0)
            }
            Err(e) => {
                buf.truncate(start);
                Err(AcquisitionError::transport("read", e))
            }
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.port.write_all(bytes).map_err(|e| AcquisitionError::transport("write", e))
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match self.port.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    if byte[0] == b'\n' {
                        break;
                    }
                    line.push(byte[0]);
                }
                Err(e) if e.kind() == ErrorKind::TimedOut => break,
                Err(e) => return Err(AcquisitionError::transport("read_line", e)),
            }
        }
        Ok(String::from_utf8_lossy(&line).trim().to_string())
    }

    fn clear_io_buffers(&mut self) -> Result<()> {
        self.port
            .clear(ClearBuffer::All)
            .map_err(|e| AcquisitionError::transport("clear", e.into()))
    }
}
