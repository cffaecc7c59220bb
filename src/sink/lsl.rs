//! Lab Streaming Layer (LSL) outlet sink.
//!
//! Pushes one channel vector per decoded sample to an LSL outlet so
//! external consumers (recorders, viewers) can pick the stream up on
//! the local network. Requires the native liblsl, hence the `lsl`
//! feature gate.

use lsl::{ExPushable, StreamInfo, StreamOutlet};
use tracing::info;

use super::SampleSink;
use crate::error::{AcquisitionError, Result};
use crate::types::{BoardProfile, DecodedSample};

/// Stream name advertised on the network.
const STREAM_NAME: &str = "BioAmpDataStream";

/// LSL content type for biosignal data.
const STREAM_TYPE: &str = "EXG";

/// Source id so consumers can re-acquire the stream across restarts.
const SOURCE_ID: &str = "UpsideDownLabs";

/// LSL outlet sink.
pub struct LslSink {
    outlet: StreamOutlet,
}

impl LslSink {
    /// Open an outlet sized for the connected board.
    pub fn create(profile: &BoardProfile) -> Result<Self> {
        let info = StreamInfo::new(
            STREAM_NAME,
            STREAM_TYPE,
            profile.channel_count as u32,
            profile.sampling_rate as f64,
            lsl::ChannelFormat::Float32,
            SOURCE_ID,
        )
        .map_err(|e| {
            AcquisitionError::sink_failed("lsl", format!("stream info creation failed: {e}"))
        })?;

        let outlet = StreamOutlet::new(&info, 0, 360).map_err(|e| {
            AcquisitionError::sink_failed("lsl", format!("outlet creation failed: {e}"))
        })?;

        info!(
            stream = STREAM_NAME,
            channels = profile.channel_count,
            rate = profile.sampling_rate,
            "LSL stream started"
        );
        Ok(Self { outlet })
    }
}

impl SampleSink for LslSink {
    fn name(&self) -> &'static str {
        "lsl"
    }

    fn append(&mut self, sample: &DecodedSample) -> Result<()> {
        self.outlet
            .push_sample_ex(&sample.channels, 0.0, true)
            .map_err(|e| AcquisitionError::sink_failed("lsl", format!("push failed: {e}")))
    }

    fn close(&mut self) -> Result<()> {
        // Dropping the outlet tears the stream down; consumers see the
        // stream end on their side.
        info!(stream = STREAM_NAME, "closing LSL stream");
        Ok(())
    }
}
