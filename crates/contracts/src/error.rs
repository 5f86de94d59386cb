//! Layered error definitions
//!
//! Categorized by source: config / telemetry / segment / fetch

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Telemetry Errors =====
    /// The telemetry link is gone (period primitive failed)
    #[error("telemetry source '{source_name}' link error: {message}")]
    TelemetryLink {
        source_name: String,
        message: String,
    },

    /// Replay input could not be decoded
    #[error("replay input '{path}' is malformed: {message}")]
    ReplayFormat { path: PathBuf, message: String },

    // ===== Segment Errors =====
    /// Segment file I/O failure
    #[error("segment '{path}' io error: {source}")]
    SegmentIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create telemetry link error
    pub fn telemetry_link(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TelemetryLink {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create segment I/O error
    pub fn segment_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::SegmentIo {
            path: path.into(),
            source,
        }
    }
}

/// Failure to read one value from the telemetry source.
///
/// Always transient from the recorder's point of view: the affected cells are
/// filled with placeholders and the loop continues.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// The source could not produce the value this period
    #[error("'{variable}' unavailable: {message}")]
    Unavailable { variable: String, message: String },

    /// The source has no getter for this name
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    /// The value width disagrees with the catalog arity
    #[error("'{variable}' returned {actual} values, catalog expects {expected}")]
    ArityMismatch {
        variable: String,
        expected: usize,
        actual: usize,
    },

    /// The source is not connected
    #[error("telemetry source disconnected")]
    Disconnected,
}

impl FetchError {
    /// Create an unavailable-value error
    pub fn unavailable(variable: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            variable: variable.into(),
            message: message.into(),
        }
    }
}
