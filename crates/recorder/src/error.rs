//! Recorder error types

use std::path::PathBuf;

use thiserror::Error;

/// Recorder-specific errors
#[derive(Debug, Error)]
pub enum RecorderError {
    /// A segment file could not be created or its header written
    #[error("failed to open segment '{path}': {source}")]
    SegmentOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A data row could not be written
    #[error("failed to write segment '{path}': {source}")]
    SegmentWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A segment could not be flushed and closed
    #[error("failed to close segment '{path}': {source}")]
    SegmentClose {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The telemetry link is gone
    #[error("telemetry error: {0}")]
    Telemetry(#[from] contracts::ContractError),
}

impl RecorderError {
    /// Whether this is a segment I/O failure (recoverable by ending the session)
    pub fn is_segment_failure(&self) -> bool {
        !matches!(self, RecorderError::Telemetry(_))
    }

    /// Path of the affected segment, if any
    pub fn segment_path(&self) -> Option<&PathBuf> {
        match self {
            RecorderError::SegmentOpen { path, .. }
            | RecorderError::SegmentWrite { path, .. }
            | RecorderError::SegmentClose { path, .. } => Some(path),
            RecorderError::Telemetry(_) => None,
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, RecorderError>;
