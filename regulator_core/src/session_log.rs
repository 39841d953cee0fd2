//! Per-session sample log.
//!
//! One CSV per session, named after the session start time, with rows
//! `timestamp,pressure,valve_position`. Written once, when the session stops.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::atomic::write_atomic;
use crate::error::RegulatorError;
use crate::types::Sample;

pub const CSV_HEADER: &str = "timestamp,pressure,valve_position";

/// Receives the samples of a finished session.
pub trait SampleSink {
    /// Persist `samples`; returns where they went, if anywhere.
    fn write_session(
        &mut self,
        started_at: DateTime<Utc>,
        samples: &[Sample],
    ) -> Result<Option<PathBuf>, RegulatorError>;
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl SampleSink for NullSink {
    fn write_session(
        &mut self,
        _started_at: DateTime<Utc>,
        _samples: &[Sample],
    ) -> Result<Option<PathBuf>, RegulatorError> {
        Ok(None)
    }
}

/// Writes `session_<start>.csv` files into a directory.
#[derive(Debug, Clone)]
pub struct CsvSessionWriter {
    dir: PathBuf,
}

impl CsvSessionWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name_for(started_at: DateTime<Utc>) -> String {
        format!("session_{}.csv", started_at.format("%Y%m%d-%H%M%S%.3f"))
    }

    /// First unused path for a session started at `started_at`.
    ///
    /// Sessions starting in the same millisecond get `-1`, `-2`, ... suffixes
    /// instead of replacing each other.
    pub fn path_for(&self, started_at: DateTime<Utc>) -> PathBuf {
        let path = self.dir.join(Self::file_name_for(started_at));
        if !path.exists() {
            return path;
        }
        let stem = format!("session_{}", started_at.format("%Y%m%d-%H%M%S%.3f"));
        (1u32..)
            .map(|n| self.dir.join(format!("{stem}-{n}.csv")))
            .find(|p| !p.exists())
            .unwrap_or(path)
    }
}

fn log_err(e: impl std::fmt::Display) -> RegulatorError {
    RegulatorError::SessionLog(e.to_string())
}

/// Render samples as CSV text, header included.
pub fn to_csv(samples: &[Sample]) -> Result<Vec<u8>, RegulatorError> {
    let mut out = Vec::with_capacity(64 + samples.len() * 48);
    out.extend_from_slice(CSV_HEADER.as_bytes());
    out.push(b'\n');
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(out);
    for s in samples {
        wtr.serialize(s).map_err(log_err)?;
    }
    wtr.into_inner().map_err(log_err)
}

impl SampleSink for CsvSessionWriter {
    fn write_session(
        &mut self,
        started_at: DateTime<Utc>,
        samples: &[Sample],
    ) -> Result<Option<PathBuf>, RegulatorError> {
        let path = self.path_for(started_at);
        let bytes = to_csv(samples)?;
        write_atomic(&path, &bytes).map_err(|e| log_err(format!("{}: {e}", path.display())))?;
        tracing::info!(path = %path.display(), rows = samples.len(), "session log written");
        Ok(Some(path))
    }
}

/// Load a session CSV back into samples.
pub fn read_session_csv(path: &Path) -> Result<Vec<Sample>, RegulatorError> {
    let mut rdr = csv::Reader::from_path(path).map_err(log_err)?;
    rdr.deserialize::<Sample>()
        .map(|row| row.map_err(log_err))
        .collect()
}
