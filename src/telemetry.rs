//! Sample-rate telemetry: per-second throughput and long-run drift.
//!
//! Two wall-clock windows run side by side once the first valid packet
//! arrives: a one-second window reporting samples per second, and a
//! ten-minute window comparing the observed rate against the board's
//! nominal sampling rate. Drift is expressed as seconds gained or lost
//! per hour and is purely observational; nothing acts on it.

use std::time::{Duration, Instant};

use tracing::info;

/// One-second window length.
const SECOND_WINDOW: Duration = Duration::from_secs(1);

/// Ten-minute window length.
const DRIFT_WINDOW: Duration = Duration::from_secs(600);

/// Report emitted when a telemetry window rolls over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateReport {
    /// The one-second window elapsed.
    SamplesPerSecond { samples: u64 },

    /// The ten-minute window elapsed.
    Drift {
        /// Rate observed over the window, in samples per second.
        observed_rate: f64,
        /// Deviation from the nominal rate, in seconds per hour.
        drift_seconds_per_hour: f64,
    },
}

#[derive(Debug, Clone, Copy)]
struct Window {
    start: Instant,
    count: u64,
}

/// Tracks packet throughput against the board's nominal sampling rate.
///
/// Windows are driven by wall-clock time, not packet arrival: the
/// acquisition loop calls [`RateMonitor::poll_at`] every iteration so
/// rollovers fire even when the device goes quiet. Time is injected to
/// keep the arithmetic testable.
#[derive(Debug)]
pub struct RateMonitor {
    nominal_rate: u32,
    second: Option<Window>,
    drift: Option<Window>,
}

impl RateMonitor {
    /// Create a monitor for a board with the given nominal rate.
    pub fn new(nominal_rate: u32) -> Self {
        Self { nominal_rate, second: None, drift: None }
    }

    /// Record one valid packet. The first packet of a session starts
    /// both windows.
    pub fn record_packet(&mut self) {
        self.record_packet_at(Instant::now());
    }

    /// [`RateMonitor::record_packet`] with an injected clock.
    pub fn record_packet_at(&mut self, now: Instant) {
        self.second.get_or_insert(Window { start: now, count: 0 }).count += 1;
        self.drift.get_or_insert(Window { start: now, count: 0 }).count += 1;
    }

    /// Check both windows for rollover, emitting at most one report per
    /// window. Called once per acquisition-loop iteration.
    pub fn poll(&mut self) -> Vec<RateReport> {
        self.poll_at(Instant::now())
    }

    /// [`RateMonitor::poll`] with an injected clock.
    pub fn poll_at(&mut self, now: Instant) -> Vec<RateReport> {
        let mut reports = Vec::new();

        if let Some(window) = self.second.as_mut()
            && now.duration_since(window.start) >= SECOND_WINDOW
        {
            reports.push(RateReport::SamplesPerSecond { samples: window.count });
            info!(samples = window.count, "throughput for the last second");
            *window = Window { start: now, count: 0 };
        }

        if let Some(window) = self.drift.as_mut()
            && now.duration_since(window.start) >= DRIFT_WINDOW
        {
            let observed_rate = window.count as f64 / DRIFT_WINDOW.as_secs_f64();
            let nominal = self.nominal_rate as f64;
            let drift_seconds_per_hour = (observed_rate - nominal) / nominal * 3600.0;
            reports.push(RateReport::Drift { observed_rate, drift_seconds_per_hour });
            info!(
                observed_rate,
                nominal_rate = self.nominal_rate,
                drift_seconds_per_hour,
                "ten-minute rate check"
            );
            *window = Window { start: now, count: 0 };
        }

        reports
    }
}
