//! In-process live streaming sink.
//!
//! Fans decoded samples out to any number of in-process subscribers
//! over a bounded broadcast channel. Acquisition never blocks on a
//! slow consumer: a subscriber that falls behind loses the oldest
//! samples, which a live view can tolerate.

use futures::Stream;
use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use super::SampleSink;
use crate::error::Result;
use crate::types::DecodedSample;

/// Default broadcast queue depth: a few seconds at the supported
/// sampling rates.
pub const DEFAULT_QUEUE_DEPTH: usize = 2048;

/// Live streaming sink backed by a `tokio` broadcast channel.
pub struct LiveStreamSink {
    tx: broadcast::Sender<DecodedSample>,
}

impl LiveStreamSink {
    /// Create a sink with the default queue depth.
    pub fn new() -> Self {
        Self::with_queue_depth(DEFAULT_QUEUE_DEPTH)
    }

    /// Create a sink with an explicit per-subscriber queue depth.
    pub fn with_queue_depth(depth: usize) -> Self {
        let (tx, _) = broadcast::channel(depth);
        Self { tx }
    }

    /// Subscribe to the live sample stream.
    ///
    /// Lagged subscribers skip over the samples they missed rather
    /// than erroring out of the stream.
    pub fn subscribe(&self) -> impl Stream<Item = DecodedSample> + Send + 'static {
        BroadcastStream::new(self.tx.subscribe()).filter_map(|item| async move { item.ok() })
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for LiveStreamSink {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleSink for LiveStreamSink {
    fn name(&self) -> &'static str {
        "live-stream"
    }

    fn append(&mut self, sample: &DecodedSample) -> Result<()> {
        // send only fails when no subscriber exists, which is not a
        // sink failure: subscribers come and go during a run.
        let _ = self.tx.send(sample.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
