//! RecorderConfig - Config Loader output
//!
//! Describes the complete recorder setup: robot link, output template,
//! sampling rate, variable selection, rotation policy, debounce tuning and
//! which telemetry source drives the loop.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Default side-channel variable list file
pub const DEFAULT_VARIABLES_FILE: &str = "record_variables_input.txt";

/// Complete recorder configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RecorderConfig {
    /// Robot link settings
    #[validate(nested)]
    pub robot: RobotConfig,

    /// Capture settings
    #[validate(nested)]
    pub recording: RecordingConfig,

    /// Segment rotation policy
    #[validate(nested)]
    pub rotation: RotationPolicy,

    /// Debounce and check cadence
    #[validate(nested)]
    pub debounce: DebounceConfig,

    /// Which telemetry source to drive
    pub source: SourceConfig,
}

/// Robot link settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RobotConfig {
    /// Robot controller address
    #[validate(length(min = 1))]
    pub address: String,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            address: "localhost".to_string(),
        }
    }
}

/// Capture settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RecordingConfig {
    /// Output path template, e.g. `data/robot_data.csv`
    pub output: PathBuf,

    /// Sampling frequency (Hz)
    #[validate(range(min = 0.01, max = 1000.0))]
    pub frequency_hz: f64,

    /// Explicit variable list (None = side-channel file, then catalog default)
    pub variables: Option<Vec<String>>,

    /// Side-channel variable list file
    pub variables_file: PathBuf,

    /// Periods between status lines (0 = never)
    pub status_every: u64,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("robot_data.csv"),
            frequency_hz: 250.0,
            variables: None,
            variables_file: PathBuf::from(DEFAULT_VARIABLES_FILE),
            status_every: 10,
        }
    }
}

/// Segment rotation policy; the two triggers are OR-combined
///
/// A limit of `None` or `0` disables that trigger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RotationPolicy {
    /// Rotate when the open segment reaches this size (MB, at most 1 TiB)
    #[validate(range(min = 0.0, max = 1048576.0))]
    pub max_file_size_mb: Option<f64>,

    /// Rotate when the open segment has been open this long (minutes, at most a year)
    #[validate(range(min = 0.0, max = 525600.0))]
    pub max_duration_minutes: Option<f64>,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_file_size_mb: None,
            max_duration_minutes: Some(60.0),
        }
    }
}

impl RotationPolicy {
    /// Policy with both triggers disabled
    pub fn unlimited() -> Self {
        Self {
            max_file_size_mb: None,
            max_duration_minutes: None,
        }
    }

    /// Active size limit in bytes
    pub fn size_limit_bytes(&self) -> Option<u64> {
        self.max_file_size_mb
            .filter(|mb| mb.is_finite() && *mb > 0.0)
            .map(|mb| (mb * BYTES_PER_MB) as u64)
    }

    /// Active duration limit
    ///
    /// A limit too large for a `Duration` never triggers, so it counts as none.
    pub fn duration_limit(&self) -> Option<Duration> {
        self.max_duration_minutes
            .filter(|min| *min > 0.0)
            .and_then(|min| Duration::try_from_secs_f64(min * 60.0).ok())
    }

    /// Whether any trigger is active
    pub fn is_active(&self) -> bool {
        self.size_limit_bytes().is_some() || self.duration_limit().is_some()
    }
}

/// Bytes in one megabyte as used for rotation limits
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Debounce thresholds and check cadence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DebounceConfig {
    /// Consecutive PLAYING observations required to start recording
    #[validate(range(min = 1))]
    pub start_threshold: u32,

    /// Consecutive non-PLAYING observations required to stop recording
    #[validate(range(min = 1))]
    pub stop_threshold: u32,

    /// Seconds between state / rotation checks
    #[validate(range(exclusive_min = 0.0))]
    pub check_interval_s: f64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            start_threshold: 3,
            stop_threshold: 2,
            check_interval_s: 1.0,
        }
    }
}

impl DebounceConfig {
    /// Check cadence expressed in sampling periods (at least 1)
    pub fn check_every(&self, frequency_hz: f64) -> u64 {
        (self.check_interval_s * frequency_hz).round().max(1.0) as u64
    }
}

/// Telemetry source selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Source kind
    pub kind: SourceKind,

    /// Recorded CSV to replay (required for `replay`)
    pub replay_path: Option<PathBuf>,
}

/// Telemetry source kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Time-driven simulated robot
    #[default]
    Simulated,
    /// Replay of a previously recorded segment
    Replay,
}
