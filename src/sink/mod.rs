//! Sample sinks: recording and live streaming.
//!
//! Sinks are fire-and-forget from the acquisition core's perspective:
//! a sink that fails to accept a sample is disabled for the remainder
//! of the run with one warning, and acquisition continues. Closing is
//! idempotent.

mod broadcast;
mod csv;
#[cfg(feature = "lsl")]
mod lsl;

pub use broadcast::LiveStreamSink;
pub use csv::CsvRecorder;
#[cfg(feature = "lsl")]
pub use lsl::LslSink;

use tracing::{debug, warn};

use crate::error::Result;
use crate::types::DecodedSample;

/// Destination for decoded samples.
pub trait SampleSink: Send {
    /// Short name used in logs when the sink is disabled.
    fn name(&self) -> &'static str;

    /// Accept one decoded sample.
    fn append(&mut self, sample: &DecodedSample) -> Result<()>;

    /// Flush and release resources. Called exactly once by the owning
    /// [`SinkSet`]; implementations may be called again defensively and
    /// must tolerate it.
    fn close(&mut self) -> Result<()>;
}

struct SinkSlot {
    sink: Box<dyn SampleSink>,
    failed: bool,
}

/// The set of active sinks a session dispatches to.
///
/// Dispatch is synchronous and best-effort: the first failure disables
/// that sink and reports it once, per the degrade-gracefully policy.
#[derive(Default)]
pub struct SinkSet {
    slots: Vec<SinkSlot>,
    closed: bool,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink to the set.
    pub fn push(&mut self, sink: Box<dyn SampleSink>) {
        self.slots.push(SinkSlot { sink, failed: false });
    }

    /// True when no sink was ever registered.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of sinks still accepting samples.
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.failed).count()
    }

    /// Forward one sample to every still-active sink.
    pub fn dispatch(&mut self, sample: &DecodedSample) {
        for slot in &mut self.slots {
            if slot.failed {
                continue;
            }
            if let Err(e) = slot.sink.append(sample) {
                warn!(sink = slot.sink.name(), error = %e, "sink failed, disabling it for this run");
                slot.failed = true;
            }
        }
    }

    /// Close every sink. Safe to call more than once; only the first
    /// call reaches the sinks.
    pub fn close_all(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        for slot in &mut self.slots {
            if let Err(e) = slot.sink.close() {
                warn!(sink = slot.sink.name(), error = %e, "sink close failed");
            } else {
                debug!(sink = slot.sink.name(), "sink closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AcquisitionError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink {
        appended: Arc<AtomicUsize>,
        closed: Arc<AtomicUsize>,
        fail_on: Option<usize>,
        seen: usize,
    }

    impl CountingSink {
        fn new(
            appended: Arc<AtomicUsize>,
            closed: Arc<AtomicUsize>,
            fail_on: Option<usize>,
        ) -> Self {
            Self { appended, closed, fail_on, seen: 0 }
        }
    }

    impl SampleSink for CountingSink {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn append(&mut self, _sample: &DecodedSample) -> Result<()> {
            self.seen += 1;
            if self.fail_on == Some(self.seen) {
                return Err(AcquisitionError::sink_failed("counting", "scripted failure"));
            }
            self.appended.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn sample() -> DecodedSample {
        DecodedSample::new(0, vec![1.0, 2.0, 3.0])
    }

    #[test]
    fn failing_sink_is_disabled_without_stopping_others() {
        let good = Arc::new(AtomicUsize::new(0));
        let bad = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));

        let mut sinks = SinkSet::new();
        sinks.push(Box::new(CountingSink::new(good.clone(), closed.clone(), None)));
        sinks.push(Box::new(CountingSink::new(bad.clone(), closed.clone(), Some(2))));

        for _ in 0..4 {
            sinks.dispatch(&sample());
        }

        assert_eq!(good.load(Ordering::SeqCst), 4);
        // The failing sink accepted one sample, failed on the second,
        // and saw nothing afterwards.
        assert_eq!(bad.load(Ordering::SeqCst), 1);
        assert_eq!(sinks.active_count(), 1);
    }

    #[test]
    fn close_all_is_idempotent() {
        let appended = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));

        let mut sinks = SinkSet::new();
        sinks.push(Box::new(CountingSink::new(appended, closed.clone(), None)));

        sinks.close_all();
        sinks.close_all();
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }
}
