//! CSV recording sink.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use super::SampleSink;
use crate::error::{AcquisitionError, Result};
use crate::types::{BoardProfile, DecodedSample};

/// Records samples to a timestamped CSV file.
///
/// The file starts with two metadata rows (board, sampling rate) and a
/// blank separator, then a `Counter,Channel1..ChannelN` header and one
/// row per sample.
pub struct CsvRecorder {
    writer: Option<csv::Writer<File>>,
    path: PathBuf,
}

impl CsvRecorder {
    /// Create a recorder writing to `chordlink-YYYYmmdd-HHMMSS.csv` in
    /// the current directory.
    pub fn create(profile: &BoardProfile) -> Result<Self> {
        let filename = format!("chordlink-{}.csv", Local::now().format("%Y%m%d-%H%M%S"));
        Self::create_at(profile, filename)
    }

    /// Create a recorder writing to an explicit path.
    pub fn create_at(profile: &BoardProfile, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| {
            AcquisitionError::sink_failed_with_source(
                "csv",
                format!("cannot create {}", path.display()),
                Box::new(e),
            )
        })?;

        // Metadata preamble, then the column header.
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(file);
        write_row(&mut writer, &[format!("Board: {}", profile.id)])?;
        write_row(
            &mut writer,
            &[format!("Sampling Rate (samples per second): {}", profile.sampling_rate)],
        )?;
        write_row(&mut writer, &[String::new()])?;

        let mut header = vec!["Counter".to_string()];
        header.extend((1..=profile.channel_count).map(|i| format!("Channel{i}")));
        write_row(&mut writer, &header)?;

        info!(path = %path.display(), "CSV recording started");
        Ok(Self { writer: Some(writer), path })
    }

    /// Path of the file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_row(writer: &mut csv::Writer<File>, fields: &[String]) -> Result<()> {
    writer
        .write_record(fields)
        .map_err(|e| AcquisitionError::sink_failed_with_source("csv", "write failed", Box::new(e)))
}

impl SampleSink for CsvRecorder {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn append(&mut self, sample: &DecodedSample) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| AcquisitionError::sink_failed("csv", "recorder already closed"))?;

        let mut row = Vec::with_capacity(1 + sample.channels.len());
        row.push(sample.counter.to_string());
        row.extend(sample.channels.iter().map(|v| v.to_string()));
        write_row(writer, &row)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| {
                AcquisitionError::sink_failed_with_source("csv", "flush failed", Box::new(e))
            })?;
            info!(path = %self.path.display(), "CSV recording saved");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    fn uno() -> &'static BoardProfile {
        BoardProfile::lookup("UNO-R3").unwrap()
    }

    #[test]
    fn writes_preamble_header_and_rows() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("capture.csv");

        let mut recorder = CsvRecorder::create_at(uno(), &path)?;
        recorder.append(&DecodedSample::new(7, vec![1.0, 2.5, 3.0, 4.0, 5.0, 6.0]))?;
        recorder.close()?;

        let contents =
            std::fs::read_to_string(&path).context("recording should exist after close")?;
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "Board: UNO-R3");
        assert_eq!(lines[1], "Sampling Rate (samples per second): 250");
        assert_eq!(lines[2], "\"\"");
        assert_eq!(lines[3], "Counter,Channel1,Channel2,Channel3,Channel4,Channel5,Channel6");
        assert_eq!(lines[4], "7,1,2.5,3,4,5,6");
        Ok(())
    }

    #[test]
    fn append_after_close_reports_a_sink_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.csv");

        let mut recorder = CsvRecorder::create_at(uno(), &path).unwrap();
        recorder.close().unwrap();

        let err = recorder.append(&DecodedSample::new(0, vec![0.0; 6])).unwrap_err();
        assert!(matches!(err, AcquisitionError::Sink { .. }));

        // Closing again is harmless.
        recorder.close().unwrap();
    }
}
