//! Error types for CLI operations.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {}", path.display())]
    ConfigNotFound { path: PathBuf },

    /// Replay input not found
    #[error("Replay file not found: {}", path.display())]
    ReplayNotFound { path: PathBuf },

    /// Sessions directory missing or not a directory
    #[error("Not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    /// The recording loop stopped on a fatal error
    #[error("Recording aborted after {samples} samples: {message}")]
    RecordingAborted { samples: u64, message: String },
}

impl CliError {
    pub fn config_not_found(path: &Path) -> Self {
        Self::ConfigNotFound {
            path: path.to_path_buf(),
        }
    }

    pub fn replay_not_found(path: &Path) -> Self {
        Self::ReplayNotFound {
            path: path.to_path_buf(),
        }
    }

    pub fn not_a_directory(path: &Path) -> Self {
        Self::NotADirectory {
            path: path.to_path_buf(),
        }
    }

    pub fn recording_aborted(samples: u64, message: impl Into<String>) -> Self {
        Self::RecordingAborted {
            samples,
            message: message.into(),
        }
    }
}
