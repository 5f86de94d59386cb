//! Fixed-rate period clock
//!
//! Shared pacing for every source: `begin` stamps the start of a period and
//! `finish` sleeps for whatever remains of it. Overrunning periods are counted
//! and never slept.

use std::time::Duration;

use contracts::{ContractError, PeriodMarker};
use tokio::time::{sleep_until, Instant};
use tracing::{trace, warn};

/// Shortest period (1000 Hz)
pub const MIN_PERIOD: Duration = Duration::from_millis(1);
/// Longest period (0.01 Hz)
pub const MAX_PERIOD: Duration = Duration::from_secs(100);

/// Fixed-rate period clock
#[derive(Debug)]
pub struct PeriodClock {
    period: Duration,
    tick: u64,
    started: Option<Instant>,
    overruns: u64,
}

impl PeriodClock {
    /// Create a clock ticking at `frequency_hz`
    ///
    /// The period is clamped to `MIN_PERIOD..=MAX_PERIOD`; a frequency with no
    /// representable period (zero, negative, NaN, subnormal) gets `MAX_PERIOD`.
    pub fn new(frequency_hz: f64) -> Self {
        let period = match Duration::try_from_secs_f64(1.0 / frequency_hz) {
            Ok(period) => period.clamp(MIN_PERIOD, MAX_PERIOD),
            Err(_) => {
                warn!(frequency_hz, "Unusable sampling frequency, using the longest period");
                MAX_PERIOD
            }
        };
        Self::with_period(period)
    }

    /// Create a clock with an explicit period length
    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            tick: 0,
            started: None,
            overruns: 0,
        }
    }

    /// Period length
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Index of the current (or next) period
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Periods whose work took longer than the period itself
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// Start a period
    pub fn begin(&mut self) -> PeriodMarker {
        self.started = Some(Instant::now());
        PeriodMarker { tick: self.tick }
    }

    /// Sleep until the period started by `marker` has elapsed
    ///
    /// # Errors
    /// Returns a link error when `marker` does not belong to the open period.
    pub async fn finish(&mut self, source: &str, marker: PeriodMarker) -> Result<(), ContractError> {
        let started = match self.started.take() {
            Some(started) if marker.tick == self.tick => started,
            _ => {
                return Err(ContractError::telemetry_link(
                    source,
                    format!("period marker {} does not match open period", marker.tick),
                ))
            }
        };

        let deadline = started + self.period;
        if Instant::now() > deadline {
            self.overruns += 1;
            trace!(tick = self.tick, "Period overrun");
        } else {
            sleep_until(deadline).await;
        }
        self.tick += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_frequency_is_clamped() {
        assert_eq!(PeriodClock::new(250.0).period(), Duration::from_millis(4));
        assert_eq!(PeriodClock::new(1e-310).period(), MAX_PERIOD);
        assert_eq!(PeriodClock::new(f64::NAN).period(), MAX_PERIOD);
        assert_eq!(PeriodClock::new(-3.0).period(), MAX_PERIOD);
        assert_eq!(PeriodClock::new(0.0).period(), MAX_PERIOD);
        assert_eq!(PeriodClock::new(f64::INFINITY).period(), MIN_PERIOD);
        assert_eq!(PeriodClock::new(1e6).period(), MIN_PERIOD);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finish_sleeps_remaining_period() {
        let mut clock = PeriodClock::new(100.0);
        let start = Instant::now();
        let marker = clock.begin();
        tokio::time::advance(Duration::from_millis(4)).await;
        clock.finish("test", marker).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(10));
        assert_eq!(clock.tick(), 1);
        assert_eq!(clock.overruns(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrun_does_not_sleep() {
        let mut clock = PeriodClock::new(100.0);
        let marker = clock.begin();
        tokio::time::advance(Duration::from_millis(25)).await;
        let before = Instant::now();
        clock.finish("test", marker).await.unwrap();
        assert_eq!(before.elapsed(), Duration::ZERO);
        assert_eq!(clock.overruns(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_marker_rejected() {
        let mut clock = PeriodClock::new(50.0);
        let marker = clock.begin();
        clock.finish("test", marker).await.unwrap();
        let err = clock.finish("test", marker).await.unwrap_err();
        assert!(matches!(err, ContractError::TelemetryLink { .. }));
    }
}
