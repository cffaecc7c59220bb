//! Latest-wins throttling for live sample streams.
//!
//! A live view subscribed to a 500 Hz board rarely wants every sample;
//! throttling keeps only the newest sample per refresh interval, so a
//! plot redrawing at 30 Hz is never behind the signal. A quiet interval
//! emits nothing and keeps waiting; the throttled stream only ends when
//! the source does.

use futures::{Stream, ready};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior, interval};

/// Adds latest-wins throttling to any sample stream.
pub trait ThrottleExt: Stream {
    /// Emit at most one item per `period`, keeping only the newest when
    /// several arrive within one interval.
    fn throttle(self, period: Duration) -> Throttle<Self>
    where
        Self: Sized,
    {
        Throttle::new(self, period)
    }
}

impl<T: Stream> ThrottleExt for T {}

pin_project! {
    /// Stream combinator produced by [`ThrottleExt::throttle`].
    pub struct Throttle<S: Stream> {
        #[pin]
        source: S,
        ticks: Interval,
        latest: Option<S::Item>,
    }
}

impl<S: Stream> Throttle<S> {
    fn new(source: S, period: Duration) -> Self {
        let mut ticks = interval(period);
        // A stalled consumer gets one late emission, not a burst.
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { source, ticks, latest: None }
    }
}

impl<S: Stream> Stream for Throttle<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            // Take everything the source has ready; newer replaces older.
            loop {
                match this.source.as_mut().poll_next(cx) {
                    Poll::Ready(Some(item)) => *this.latest = Some(item),
                    // Source finished: flush the held item, then end.
                    Poll::Ready(None) => return Poll::Ready(this.latest.take()),
                    Poll::Pending => break,
                }
            }

            // Emissions happen on tick boundaries only. An interval
            // with nothing buffered goes back to waiting; the source's
            // waker is already registered from the drain above.
            ready!(this.ticks.poll_tick(cx));
            if let Some(item) = this.latest.take() {
                return Poll::Ready(Some(item));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio::time::timeout;

    #[tokio::test(start_paused = true)]
    async fn keeps_only_the_latest_sample_per_interval() {
        let samples = futures::stream::iter(0..100u8);
        let mut throttled = samples.throttle(Duration::from_millis(50));

        // The iter stream is always ready, so the drain reaches its end
        // and the newest value wins.
        assert_eq!(throttled.next().await, Some(99));
        assert_eq!(throttled.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_interval_does_not_end_the_stream() {
        let silent = futures::stream::pending::<u8>();
        let mut throttled = silent.throttle(Duration::from_millis(10));

        // Many intervals elapse with no samples; next() must still be
        // waiting rather than reporting the stream closed.
        let result = timeout(Duration::from_secs(1), throttled.next()).await;
        assert!(result.is_err(), "throttle ended a stream whose source is still alive");
    }

    #[tokio::test(start_paused = true)]
    async fn empty_stream_ends_without_emitting() {
        let samples = futures::stream::iter(std::iter::empty::<u8>());
        let mut throttled = samples.throttle(Duration::from_millis(10));
        assert_eq!(throttled.next().await, None);
    }
}
