// error.rs — Error types for the event and sink subsystem.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while persisting or encoding records.
///
/// Sinks never propagate these through [`crate::EmissionSink::emit`]; they
/// surface only from the fallible helpers such as [`crate::JsonlSink::try_emit`].
#[derive(Debug, Error)]
pub enum EventsError {
    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to serialize a record or its event data.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EventsError {
    /// Map an I/O failure at `path`, for use with `map_err`.
    pub fn io(path: &Path) -> impl FnOnce(std::io::Error) -> EventsError {
        let path = path.to_path_buf();
        move |source| EventsError::Io { path, source }
    }
}
