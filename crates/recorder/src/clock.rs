//! Timestamp reconciler
//!
//! The device clock restarts at an arbitrary zero for every program run. Each
//! session binds it to wall-clock time exactly once, at its first data row,
//! and every later row of that session (across rotations) reuses the same
//! offset.

use chrono::Utc;

/// Binding of a session's device clock to wall-clock time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimestampAnchor {
    /// Device clock at the first row (s)
    pub first_device_timestamp: f64,
    /// Wall clock at the first row (s since the Unix epoch)
    pub wall_clock_at_anchor: f64,
    /// `wall_clock_at_anchor - first_device_timestamp`
    pub offset: f64,
}

impl TimestampAnchor {
    /// Anchor a device timestamp to a wall-clock instant
    pub fn anchor(device_timestamp: f64, wall_clock_now: f64) -> Self {
        Self {
            first_device_timestamp: device_timestamp,
            wall_clock_at_anchor: wall_clock_now,
            offset: wall_clock_now - device_timestamp,
        }
    }

    /// Physical (wall-clock) time of a device timestamp
    pub fn physical_time(&self, device_timestamp: f64) -> f64 {
        device_timestamp + self.offset
    }
}

/// Current wall clock in seconds since the Unix epoch
pub fn wall_clock_now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_maps_first_sample_to_wall_clock() {
        let anchor = TimestampAnchor::anchor(12.5, 1_700_000_000.0);
        assert_eq!(anchor.offset, 1_700_000_000.0 - 12.5);
        assert_eq!(anchor.physical_time(12.5), 1_700_000_000.0);
        assert_eq!(anchor.physical_time(13.0), 1_700_000_000.5);
    }

    #[test]
    fn test_restarted_device_clock_is_invisible() {
        let first = TimestampAnchor::anchor(4321.0, 1_700_000_000.0);
        let second = TimestampAnchor::anchor(0.0, 1_700_000_060.0);
        assert_eq!(first.physical_time(4321.0 + 1.0), 1_700_000_001.0);
        assert_eq!(second.physical_time(1.0), 1_700_000_061.0);
    }

    #[test]
    fn test_wall_clock_is_epoch_seconds() {
        assert!(wall_clock_now() > 1_600_000_000.0);
    }
}
