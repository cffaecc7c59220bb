//! Acquisition session: the read/frame/decode/dispatch loop and its
//! lifecycle.
//!
//! A session owns all mutable acquisition state (byte buffer, sequence
//! tracker, telemetry windows, sinks) and drives it from one
//! synchronous poll loop, so no locking is needed anywhere in the core.
//! Shutdown is cooperative: a cancellation token is checked at the top
//! of every iteration, and every exit path funnels through one
//! idempotent cleanup routine.

use std::fmt;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{AcquisitionError, Result};
use crate::protocol::{FramerStats, PacketFramer, SampleDecoder};
use crate::sink::SinkSet;
use crate::telemetry::RateMonitor;
use crate::transport::{Command, Transport, send_command};
use crate::types::BoardProfile;

/// Lifecycle states of an acquisition session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Streaming,
    Stopping,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Streaming => "streaming",
            SessionState::Stopping => "stopping",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Session tuning knobs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Stop streaming after this long; `None` runs until cancelled.
    pub run_duration: Option<Duration>,

    /// Reflect channel values around the board's ADC midpoint.
    pub inverted: bool,

    /// Settle time after the `STOP` command before the transport
    /// buffers are cleared, giving in-flight packets time to land.
    pub stop_settle: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { run_duration: None, inverted: false, stop_settle: Duration::from_secs(1) }
    }
}

/// Final accounting for a finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// Valid packets decoded and dispatched.
    pub packets_decoded: u64,

    /// Samples inferred lost from sequence-counter gaps.
    pub missing_samples: u64,

    /// Framer resynchronization counters.
    pub framing: FramerStats,
}

/// One acquisition run against a connected board.
///
/// `Idle → Connecting → Streaming → Stopping → Closed`; [`run`] walks
/// the whole lifecycle and can only be called once.
///
/// [`run`]: AcquisitionSession::run
pub struct AcquisitionSession<T: Transport> {
    transport: T,
    profile: &'static BoardProfile,
    config: SessionConfig,
    sinks: SinkSet,
    cancel: CancellationToken,

    framer: PacketFramer,
    decoder: SampleDecoder,
    monitor: RateMonitor,
    buffer: Vec<u8>,

    state: SessionState,
    packets_decoded: u64,
    cleaned_up: bool,
}

impl<T: Transport> AcquisitionSession<T> {
    /// Create a session over an identified device.
    pub fn new(
        transport: T,
        profile: &'static BoardProfile,
        config: SessionConfig,
        sinks: SinkSet,
        cancel: CancellationToken,
    ) -> Self {
        let framer = PacketFramer::new(profile.packet_length());
        let decoder = SampleDecoder::new(profile, config.inverted);
        let monitor = RateMonitor::new(profile.sampling_rate);
        Self {
            transport,
            profile,
            config,
            sinks,
            cancel,
            framer,
            decoder,
            monitor,
            buffer: Vec::new(),
            state: SessionState::Idle,
            packets_decoded: 0,
            cleaned_up: false,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Token that stops the session at the next loop iteration.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cumulative missing-sample count so far.
    pub fn missing_samples(&self) -> u64 {
        self.decoder.missing_samples()
    }

    /// Run the full acquisition lifecycle.
    ///
    /// Returns the final summary on normal completion (duration expiry
    /// or cancellation); transport failures propagate after cleanup has
    /// run. Either way the summary is reported exactly once.
    pub fn run(&mut self) -> Result<SessionSummary> {
        if self.state != SessionState::Idle {
            return Err(AcquisitionError::InvalidState {
                state: self.state.to_string(),
                expected: SessionState::Idle.to_string(),
            });
        }

        self.state = SessionState::Connecting;
        info!(board = self.profile.id, "starting acquisition");
        let result = match send_command(&mut self.transport, Command::Start) {
            Ok(_) => {
                self.state = SessionState::Streaming;
                let deadline = self.config.run_duration.map(|d| Instant::now() + d);
                self.stream_until_stopped(deadline)
            }
            Err(e) => Err(e),
        };

        self.state = SessionState::Stopping;
        self.cleanup();
        self.state = SessionState::Closed;

        let summary = SessionSummary {
            packets_decoded: self.packets_decoded,
            missing_samples: self.decoder.missing_samples(),
            framing: self.framer.stats(),
        };
        info!(
            packets = summary.packets_decoded,
            missing_samples = summary.missing_samples,
            resyncs = summary.framing.resyncs,
            "acquisition finished"
        );

        result.map(|()| summary)
    }

    fn stream_until_stopped(&mut self, deadline: Option<Instant>) -> Result<()> {
        loop {
            if self.cancel.is_cancelled() {
                info!("cancellation requested, stopping acquisition");
                return Ok(());
            }
            if let Some(deadline) = deadline
                && Instant::now() >= deadline
            {
                info!("run duration elapsed, stopping acquisition");
                return Ok(());
            }
            self.poll_once()?;
        }
    }

    /// One loop iteration: read, drain packets, dispatch, telemetry.
    fn poll_once(&mut self) -> Result<()> {
        let read = self.transport.read_available(&mut self.buffer)?;
        if read == 0 {
            // Quiet device: re-issue the idempotent START keep-alive.
            debug!("no bytes available, re-issuing START");
            send_command(&mut self.transport, Command::Start)?;
        }

        while let Some(packet) = self.framer.next_packet(&mut self.buffer) {
            let outcome = self.decoder.decode(&packet);
            self.packets_decoded += 1;
            self.monitor.record_packet();
            self.sinks.dispatch(&outcome.sample);
        }

        // Window checks run every iteration, not only on packets.
        self.monitor.poll();
        Ok(())
    }

    /// Tear the session down: `STOP`, settle, clear transport buffers,
    /// close sinks. Idempotent; runs at most once no matter which exit
    /// path (completion, cancellation, error, drop) gets here first.
    pub fn cleanup(&mut self) {
        if self.cleaned_up {
            return;
        }
        self.cleaned_up = true;

        if let Err(e) = send_command(&mut self.transport, Command::Stop) {
            warn!(error = %e, "failed to send STOP during cleanup");
        }
        std::thread::sleep(self.config.stop_settle);
        if let Err(e) = self.transport.clear_io_buffers() {
            warn!(error = %e, "failed to clear transport buffers during cleanup");
        }
        self.sinks.close_all();
        debug!("session cleanup completed");
    }
}

impl<T: Transport> Drop for AcquisitionSession<T> {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::SampleSink;
    use crate::test_utils::{MockTransport, encode_packet};
    use crate::types::DecodedSample;
    use std::sync::{Arc, Mutex};

    fn pico() -> &'static BoardProfile {
        BoardProfile::lookup("RPI-PICO-RP2040").unwrap()
    }

    fn fast_config(run_ms: u64) -> SessionConfig {
        SessionConfig {
            run_duration: Some(Duration::from_millis(run_ms)),
            inverted: false,
            stop_settle: Duration::ZERO,
        }
    }

    /// Shared handle to a scripted transport so tests can inspect what
    /// the session wrote after the session takes ownership.
    #[derive(Clone)]
    struct SharedTransport(Arc<Mutex<MockTransport>>);

    impl SharedTransport {
        fn new(inner: MockTransport) -> Self {
            Self(Arc::new(Mutex::new(inner)))
        }

        fn start_commands(&self) -> usize {
            self.0.lock().unwrap().start_commands()
        }

        fn stop_commands(&self) -> usize {
            self.0.lock().unwrap().stop_commands()
        }
    }

    impl Transport for SharedTransport {
        fn read_available(&mut self, buf: &mut Vec<u8>) -> Result<usize> {
            self.0.lock().unwrap().read_available(buf)
        }
        fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
            self.0.lock().unwrap().write_all(bytes)
        }
        fn read_line(&mut self) -> Result<String> {
            self.0.lock().unwrap().read_line()
        }
        fn clear_io_buffers(&mut self) -> Result<()> {
            self.0.lock().unwrap().clear_io_buffers()
        }
    }

    #[derive(Clone, Default)]
    struct CapturingSink {
        samples: Arc<Mutex<Vec<DecodedSample>>>,
        closed: Arc<Mutex<usize>>,
    }

    impl SampleSink for CapturingSink {
        fn name(&self) -> &'static str {
            "capturing"
        }
        fn append(&mut self, sample: &DecodedSample) -> Result<()> {
            self.samples.lock().unwrap().push(sample.clone());
            Ok(())
        }
        fn close(&mut self) -> Result<()> {
            *self.closed.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn session_with(
        script: MockTransport,
        config: SessionConfig,
    ) -> (AcquisitionSession<SharedTransport>, SharedTransport, CapturingSink) {
        let transport = SharedTransport::new(script);
        let capture = CapturingSink::default();
        let mut sinks = SinkSet::new();
        sinks.push(Box::new(capture.clone()));
        let session = AcquisitionSession::new(
            transport.clone(),
            pico(),
            config,
            sinks,
            CancellationToken::new(),
        );
        (session, transport, capture)
    }

    #[test]
    fn streams_packets_to_sinks_until_duration_expires() {
        let mut script = MockTransport::new();
        for counter in [1u8, 2, 3] {
            script.queue_bytes(&encode_packet(counter, &[10, 20, 30]));
        }

        let (mut session, transport, capture) = session_with(script, fast_config(40));
        let summary = session.run().expect("normal completion");

        assert_eq!(summary.packets_decoded, 3);
        assert_eq!(summary.missing_samples, 0);
        assert_eq!(session.state(), SessionState::Closed);

        let samples = capture.samples.lock().unwrap();
        let counters: Vec<u8> = samples.iter().map(|s| s.counter).collect();
        assert_eq!(counters, vec![1, 2, 3]);
        assert_eq!(samples[0].channels, vec![10.0, 20.0, 30.0]);

        // Initial START plus at least one quiet-device keep-alive.
        assert!(transport.start_commands() >= 1);
        assert_eq!(transport.stop_commands(), 1);
        assert_eq!(*capture.closed.lock().unwrap(), 1);
    }

    #[test]
    fn sequence_gap_lands_in_the_summary() {
        let mut script = MockTransport::new();
        script.queue_bytes(&encode_packet(4, &[0, 0, 0]));
        script.queue_bytes(&encode_packet(7, &[0, 0, 0]));

        let (mut session, _transport, _capture) = session_with(script, fast_config(30));
        let summary = session.run().expect("normal completion");

        assert_eq!(summary.packets_decoded, 2);
        assert_eq!(summary.missing_samples, 2);
    }

    #[test]
    fn transport_error_stops_streaming_but_still_cleans_up() {
        let mut script = MockTransport::new();
        script.queue_bytes(&encode_packet(1, &[0, 0, 0]));
        script.queue_read_error();

        // No run duration: only the error can end this session.
        let config = SessionConfig { run_duration: None, stop_settle: Duration::ZERO, ..Default::default() };
        let (mut session, transport, capture) = session_with(script, config);

        let err = session.run().unwrap_err();
        assert!(matches!(err, AcquisitionError::Transport { .. }));
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(transport.stop_commands(), 1);
        assert_eq!(*capture.closed.lock().unwrap(), 1);
    }

    #[test]
    fn cancellation_is_a_normal_exit() {
        let script = MockTransport::new();
        let config = SessionConfig { run_duration: None, stop_settle: Duration::ZERO, ..Default::default() };
        let (mut session, transport, _capture) = session_with(script, config);

        session.cancellation_token().cancel();
        let summary = session.run().expect("cancellation is not an error");

        assert_eq!(summary.packets_decoded, 0);
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(transport.stop_commands(), 1);
    }

    #[test]
    fn cleanup_runs_exactly_once_across_all_paths() {
        let script = MockTransport::new();
        let (mut session, transport, capture) = session_with(script, fast_config(10));

        session.run().unwrap();
        // Explicit second call and the eventual Drop are both no-ops.
        session.cleanup();
        drop(session);

        assert_eq!(transport.stop_commands(), 1);
        assert_eq!(*capture.closed.lock().unwrap(), 1);
    }

    #[test]
    fn quiet_device_gets_a_start_keepalive() {
        let mut script = MockTransport::new();
        script.queue_silence();
        script.queue_bytes(&encode_packet(1, &[1, 2, 3]));

        let (mut session, transport, capture) = session_with(script, fast_config(150));
        session.run().unwrap();

        // Initial START, plus one per quiet read.
        assert!(transport.start_commands() >= 2);
        assert_eq!(capture.samples.lock().unwrap().len(), 1);
    }

    #[test]
    fn run_cannot_be_called_twice() {
        let script = MockTransport::new();
        let (mut session, _transport, _capture) = session_with(script, fast_config(10));

        session.run().unwrap();
        let err = session.run().unwrap_err();
        assert!(matches!(err, AcquisitionError::InvalidState { .. }));
    }

    #[test]
    fn inversion_flag_flows_through_to_samples() {
        let mut script = MockTransport::new();
        script.queue_bytes(&encode_packet(0, &[10_000, 2_000, 100]));

        let transport = SharedTransport::new(script);
        let capture = CapturingSink::default();
        let mut sinks = SinkSet::new();
        sinks.push(Box::new(capture.clone()));
        let config = SessionConfig { inverted: true, ..fast_config(30) };
        let mut session = AcquisitionSession::new(
            transport,
            pico(),
            config,
            sinks,
            CancellationToken::new(),
        );
        session.run().unwrap();

        let mid = pico().midpoint();
        let samples = capture.samples.lock().unwrap();
        assert_eq!(samples[0].channels[0], mid - (10_000.0 - mid));
        assert_eq!(samples[0].channels[1], mid + (mid - 2_000.0));
    }
}
