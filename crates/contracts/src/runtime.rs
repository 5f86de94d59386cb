//! RuntimeState - controller program state reported by the telemetry source

use serde::{Deserialize, Serialize};

/// Program execution state of the device controller
///
/// Only `Playing` versus everything else matters to the recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuntimeState {
    Stopping,
    Stopped,
    Playing,
    Pausing,
    Paused,
    Resuming,
}

impl RuntimeState {
    /// Whether a program is actively running
    pub fn is_playing(self) -> bool {
        matches!(self, RuntimeState::Playing)
    }

    /// Decode the numeric code used on the wire by the controller
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(RuntimeState::Stopping),
            1 => Some(RuntimeState::Stopped),
            2 => Some(RuntimeState::Playing),
            3 => Some(RuntimeState::Pausing),
            4 => Some(RuntimeState::Paused),
            5 => Some(RuntimeState::Resuming),
            _ => None,
        }
    }

    /// Numeric code, inverse of [`RuntimeState::from_code`]
    pub fn code(self) -> u32 {
        match self {
            RuntimeState::Stopping => 0,
            RuntimeState::Stopped => 1,
            RuntimeState::Playing => 2,
            RuntimeState::Pausing => 3,
            RuntimeState::Paused => 4,
            RuntimeState::Resuming => 5,
        }
    }
}

impl std::fmt::Display for RuntimeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            RuntimeState::Stopping => "STOPPING",
            RuntimeState::Stopped => "STOPPED",
            RuntimeState::Playing => "PLAYING",
            RuntimeState::Pausing => "PAUSING",
            RuntimeState::Paused => "PAUSED",
            RuntimeState::Resuming => "RESUMING",
        };
        f.write_str(label)
    }
}
