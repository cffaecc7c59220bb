//! Error types for acquisition and device handling.
//!
//! All errors implement `std::error::Error` and carry enough context to
//! tell transport-level failures (fatal to a streaming session) apart
//! from sink failures (degrade the failing sink, keep acquiring).
//!
//! Framing corruption and sequence gaps are deliberately *not* errors:
//! the framer self-heals by resynchronizing and the decoder counts
//! missing samples, so neither ever surfaces through this type.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for acquisition operations.
pub type Result<T, E = AcquisitionError> = std::result::Result<T, E>;

/// Main error type for acquisition operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AcquisitionError {
    #[error("Transport I/O failed during {operation}")]
    Transport {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open serial port {port}: {reason}")]
    PortOpen { port: String, reason: String },

    #[error("No compatible device found (tried {ports_tried} port/baud combinations)")]
    DeviceNotFound { ports_tried: usize },

    #[error("Device replied with unknown board identifier '{identifier}'")]
    UnknownBoard { identifier: String },

    #[error("Handshake timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Sink '{sink}' failed: {reason}")]
    Sink {
        sink: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Session is {state}, expected {expected}")]
    InvalidState { state: String, expected: String },
}

impl AcquisitionError {
    /// Returns whether this error is potentially recoverable through retry.
    ///
    /// Discovery keeps scanning after retryable failures; the session
    /// loop treats every transport error as fatal regardless.
    pub fn is_retryable(&self) -> bool {
        match self {
            AcquisitionError::Transport { .. } => false,
            AcquisitionError::PortOpen { .. } => true,
            AcquisitionError::DeviceNotFound { .. } => false,
            AcquisitionError::UnknownBoard { .. } => true,
            AcquisitionError::Timeout { .. } => true,
            AcquisitionError::Sink { .. } => false,
            AcquisitionError::InvalidState { .. } => false,
        }
    }

    /// Helper constructor for transport errors with operation context.
    pub fn transport(operation: impl Into<String>, source: std::io::Error) -> Self {
        AcquisitionError::Transport { operation: operation.into(), source }
    }

    /// Helper constructor for port-open failures.
    pub fn port_open(port: impl Into<String>, reason: impl Into<String>) -> Self {
        AcquisitionError::PortOpen { port: port.into(), reason: reason.into() }
    }

    /// Helper constructor for sink failures.
    pub fn sink_failed(sink: impl Into<String>, reason: impl Into<String>) -> Self {
        AcquisitionError::Sink { sink: sink.into(), reason: reason.into(), source: None }
    }

    /// Helper constructor for sink failures with an underlying cause.
    pub fn sink_failed_with_source(
        sink: impl Into<String>,
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        AcquisitionError::Sink { sink: sink.into(), reason: reason.into(), source: Some(source) }
    }
}

impl From<std::io::Error> for AcquisitionError {
    fn from(err: std::io::Error) -> Self {
        AcquisitionError::Transport { operation: "io".to_string(), source: err }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(test)]
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn error_messages_contain_their_context(
                port in "[a-zA-Z0-9/]+",
                identifier in "[A-Z0-9-]+",
                sink in "[a-z]+",
                reason in ".*"
            ) {
                let open = AcquisitionError::port_open(port.clone(), reason.clone());
                prop_assert!(open.to_string().contains(&port));

                let board = AcquisitionError::UnknownBoard { identifier: identifier.clone() };
                prop_assert!(board.to_string().contains(&identifier));

                let sink_err = AcquisitionError::sink_failed(sink.clone(), reason.clone());
                prop_assert!(sink_err.to_string().contains(&sink));
                prop_assert!(!sink_err.to_string().is_empty());
            }

            #[test]
            fn io_conversion_preserves_source_message(reason in "[ -~]*") {
                let io_err = std::io::Error::other(reason.clone());
                let converted: AcquisitionError = io_err.into();
                match converted {
                    AcquisitionError::Transport { source, .. } => {
                        prop_assert_eq!(source.to_string(), reason);
                    }
                    _ => prop_assert!(false, "expected Transport from io::Error"),
                }
            }
        }
    }

    #[test]
    fn error_traits_validation() {
        // Compile-time check: AcquisitionError must be Send + Sync + 'static
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<AcquisitionError>();

        let error = AcquisitionError::DeviceNotFound { ports_tried: 4 };
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn retryability_classification() {
        assert!(AcquisitionError::port_open("/dev/ttyUSB0", "busy").is_retryable());
        assert!(AcquisitionError::UnknownBoard { identifier: "GARBAGE".into() }.is_retryable());
        assert!(AcquisitionError::Timeout { duration: Duration::from_secs(1) }.is_retryable());

        let io = std::io::Error::other("gone");
        assert!(!AcquisitionError::transport("read", io).is_retryable());
        assert!(!AcquisitionError::DeviceNotFound { ports_tried: 0 }.is_retryable());
        assert!(!AcquisitionError::sink_failed("csv", "disk full").is_retryable());
    }

    #[test]
    fn sink_error_source_chain() {
        let cause: Box<dyn std::error::Error + Send + Sync> =
            Box::new(std::io::Error::other("outlet closed"));
        let err = AcquisitionError::sink_failed_with_source("lsl", "push failed", cause);
        let source = std::error::Error::source(&err).expect("sink error should chain its cause");
        assert!(source.to_string().contains("outlet closed"));
    }
}
