//! Per-iteration report - Session Controller output
//!
//! Emitted once per sampling period and once per session event; consumed by
//! metrics export and the in-memory run summary.

use serde::{Deserialize, Serialize};

use crate::RuntimeState;

/// Why a segment was rotated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationReason {
    /// Segment reached the size limit
    Size,
    /// Segment reached the duration limit
    Duration,
}

impl RotationReason {
    /// Stable label (metrics, logs)
    pub fn as_str(self) -> &'static str {
        match self {
            RotationReason::Size => "size",
            RotationReason::Duration => "duration",
        }
    }
}

impl std::fmt::Display for RotationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session lifecycle event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A new session opened its first segment
    Started { session: String },
    /// The session's open segment was closed and recording stopped
    Stopped { session: String, segments: u32 },
    /// The open segment was closed and the next one opened
    Rotated {
        session: String,
        reason: RotationReason,
        file_number: u32,
    },
    /// A segment could not be opened, written or closed
    SegmentFailed { session: String },
}

/// What happened during one sampling period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IterationReport {
    /// Period index
    pub tick: u64,
    /// State observed this period (check boundaries only)
    pub observed_state: Option<RuntimeState>,
    /// The state read failed this period
    pub state_read_failed: bool,
    /// Whether a segment was open when the period ended
    pub recording: bool,
    /// Bytes of the row written this period
    pub row_bytes: Option<usize>,
    /// Variables substituted with placeholders, with their cell counts
    pub placeholders: Vec<(String, usize)>,
    /// Time spent between period start and the period wait (ms)
    pub work_ms: f64,
}

impl IterationReport {
    /// Total placeholder cells in this period's row
    pub fn placeholder_cells(&self) -> usize {
        self.placeholders.iter().map(|(_, cells)| cells).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_cells() {
        let report = IterationReport {
            placeholders: vec![("actual_TCP_force".into(), 6), ("payload".into(), 1)],
            ..Default::default()
        };
        assert_eq!(report.placeholder_cells(), 7);
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = SessionEvent::Rotated {
            session: "2025-01-01_00-00-00".into(),
            reason: RotationReason::Size,
            file_number: 2,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""event":"rotated""#));
        assert!(json.contains(r#""reason":"size""#));
    }
}
