//! Stream utilities for live sample consumers.

mod throttle;

pub use throttle::{Throttle, ThrottleExt};
