// jsonl.rs — File-backed sink writing one JSON record per line.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::EventsError;
use crate::record::LogRecord;
use crate::sink::EmissionSink;

/// Appends records as JSONL to a file.
///
/// The file is opened per record so an external rotator can move it
/// between emissions.
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record, reporting failures to the caller.
    ///
    /// The record is encoded before the file is touched, so an encoding
    /// failure never leaves a partial line behind.
    pub fn try_emit(&self, record: &LogRecord) -> Result<(), EventsError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(EventsError::io(parent))?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()))
            .map_err(EventsError::io(&self.path))
    }

    /// Read every record back, oldest first. Blank lines are skipped.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<LogRecord>, EventsError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(EventsError::io(path))?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(EventsError::from))
            .collect()
    }
}

impl EmissionSink for JsonlSink {
    fn emit(&self, record: &LogRecord) {
        if let Err(e) = self.try_emit(record) {
            tracing::warn!("jsonl sink error: {}", e);
        }
    }
}
