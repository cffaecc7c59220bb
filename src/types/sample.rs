//! Decoded sample types and the rolling live-view window.

use std::collections::VecDeque;

use serde::Serialize;

/// One decoded multi-channel sample.
///
/// This is the fundamental data unit that flows out of the acquisition
/// core. Samples are forwarded to sinks as soon as they are decoded and
/// not retained by the session itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedSample {
    /// Wrapping sequence counter from the packet header.
    pub counter: u8,

    /// Per-channel values in board channel order.
    pub channels: Vec<f32>,
}

impl DecodedSample {
    /// Create a new decoded sample.
    pub fn new(counter: u8, channels: Vec<f32>) -> Self {
        Self { counter, channels }
    }
}

/// Fixed-capacity rolling window of recent samples for live views.
///
/// Pushing beyond capacity evicts the oldest sample, so a plotting
/// consumer always sees the most recent `capacity` columns.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<DecodedSample>,
    capacity: usize,
}

impl SampleWindow {
    /// Default window size, matching a few seconds of data at the
    /// supported sampling rates.
    pub const DEFAULT_CAPACITY: usize = 2000;

    /// Create a window holding at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self { samples: VecDeque::with_capacity(capacity), capacity }
    }

    /// Append a sample, evicting the oldest when full.
    pub fn push(&mut self, sample: DecodedSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Most recently pushed sample, if any.
    pub fn latest(&self) -> Option<&DecodedSample> {
        self.samples.back()
    }

    /// Samples currently held, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &DecodedSample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for SampleWindow {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(counter: u8) -> DecodedSample {
        DecodedSample::new(counter, vec![counter as f32; 3])
    }

    #[test]
    fn window_evicts_oldest_when_full() {
        let mut window = SampleWindow::new(3);
        for counter in 0..5 {
            window.push(sample(counter));
        }

        assert_eq!(window.len(), 3);
        let counters: Vec<u8> = window.iter().map(|s| s.counter).collect();
        assert_eq!(counters, vec![2, 3, 4]);
        assert_eq!(window.latest().unwrap().counter, 4);
    }

    #[test]
    fn window_below_capacity_keeps_everything() {
        let mut window = SampleWindow::new(10);
        window.push(sample(1));
        window.push(sample(2));

        assert_eq!(window.len(), 2);
        assert!(!window.is_empty());
        assert_eq!(window.iter().next().unwrap().counter, 1);
    }
}
