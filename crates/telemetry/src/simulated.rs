//! Simulated robot
//!
//! Time-driven stand-in for a real controller link. The program alternates
//! between an idle phase (STOPPED) and a running phase (PLAYING); the device
//! clock restarts from a fresh origin every time a program starts, exactly
//! like a controller whose clock is relative to program start.
//!
//! All behaviour is derived from the period index, so a seeded simulation is
//! fully reproducible.

use std::f64::consts::TAU;

use contracts::{
    lookup, ContractError, FetchError, PeriodMarker, RuntimeState, TelemetrySource,
    VariableValue, TIMESTAMP_VARIABLE,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, trace};

use crate::period::PeriodClock;

/// Simulation profile
#[derive(Debug, Clone)]
pub struct SimulationProfile {
    /// Sampling frequency (Hz)
    pub frequency_hz: f64,
    /// Seconds spent STOPPED between programs
    pub idle_secs: f64,
    /// Seconds a program stays PLAYING
    pub playing_secs: f64,
    /// Chance that a state read reports the opposite activity
    pub flicker_probability: f64,
    /// Chance that a single variable read fails
    pub fetch_failure_probability: f64,
    /// RNG seed (None = OS entropy)
    pub seed: Option<u64>,
}

impl Default for SimulationProfile {
    fn default() -> Self {
        Self {
            frequency_hz: 250.0,
            idle_secs: 5.0,
            playing_secs: 30.0,
            flicker_probability: 0.0,
            fetch_failure_probability: 0.0,
            seed: None,
        }
    }
}

/// Simulated robot controller
pub struct SimulatedRobot {
    name: String,
    profile: SimulationProfile,
    clock: PeriodClock,
    rng: StdRng,
    idle_ticks: u64,
    cycle_ticks: u64,
    /// Device clock base: (period index, seconds at that period)
    clock_base: (u64, f64),
    programs_started: u64,
}

impl SimulatedRobot {
    /// Create a simulated robot
    pub fn new(address: impl Into<String>, profile: SimulationProfile) -> Self {
        let clock = PeriodClock::new(profile.frequency_hz);
        let mut rng = match profile.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let idle_ticks = (profile.idle_secs * profile.frequency_hz).round().max(0.0) as u64;
        let playing_ticks = (profile.playing_secs * profile.frequency_hz).round().max(1.0) as u64;
        let power_on_clock = rng.random_range(0.0..3600.0);

        info!(
            idle_secs = profile.idle_secs,
            playing_secs = profile.playing_secs,
            frequency_hz = profile.frequency_hz,
            "Simulated robot ready"
        );

        Self {
            name: format!("sim://{}", address.into()),
            profile,
            clock,
            rng,
            idle_ticks,
            cycle_ticks: idle_ticks + playing_ticks,
            clock_base: (0, power_on_clock),
            programs_started: 0,
        }
    }

    /// Programs started so far
    pub fn programs_started(&self) -> u64 {
        self.programs_started
    }

    fn phase_position(&self) -> u64 {
        self.clock.tick() % self.cycle_ticks
    }

    fn scheduled_state(&self) -> RuntimeState {
        if self.phase_position() < self.idle_ticks {
            RuntimeState::Stopped
        } else {
            RuntimeState::Playing
        }
    }

    fn device_clock(&self) -> f64 {
        let (base_tick, origin) = self.clock_base;
        origin + (self.clock.tick() - base_tick) as f64 * self.clock.period().as_secs_f64()
    }

    fn chance(&mut self, probability: f64) -> bool {
        self.rng.random_bool(probability.clamp(0.0, 1.0))
    }

    fn signal(&self, variable: &str, width: usize) -> VariableValue {
        let t = self.clock.tick() as f64 * self.clock.period().as_secs_f64();
        let phase = variable.bytes().map(f64::from).sum::<f64>() / 100.0;
        let values: Vec<f64> = (0..width)
            .map(|i| (TAU * 0.2 * t + phase + i as f64).sin())
            .collect();
        match values.as_slice() {
            [single] => VariableValue::Scalar(*single),
            _ => VariableValue::Vector(values),
        }
    }
}

impl TelemetrySource for SimulatedRobot {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init_period(&mut self) -> Result<PeriodMarker, ContractError> {
        if self.phase_position() == self.idle_ticks {
            self.programs_started += 1;
            self.clock_base = (self.clock.tick(), 0.0);
            debug!(
                program = self.programs_started,
                tick = self.clock.tick(),
                "Simulated program started"
            );
        }
        Ok(self.clock.begin())
    }

    async fn wait_period(&mut self, marker: PeriodMarker) -> Result<(), ContractError> {
        self.clock.finish(&self.name, marker).await
    }

    fn runtime_state(&mut self) -> Result<RuntimeState, FetchError> {
        let scheduled = self.scheduled_state();
        if self.chance(self.profile.flicker_probability) {
            let flicker = if scheduled.is_playing() {
                RuntimeState::Pausing
            } else {
                RuntimeState::Playing
            };
            trace!(%scheduled, %flicker, "State flicker");
            return Ok(flicker);
        }
        Ok(scheduled)
    }

    fn timestamp(&mut self) -> Result<f64, FetchError> {
        Ok(self.device_clock())
    }

    fn fetch(&mut self, variable: &str) -> Result<VariableValue, FetchError> {
        if self.chance(self.profile.fetch_failure_probability) {
            return Err(FetchError::unavailable(variable, "simulated read failure"));
        }

        let entry =
            lookup(variable).ok_or_else(|| FetchError::UnknownVariable(variable.to_string()))?;
        let value = match entry.name {
            TIMESTAMP_VARIABLE => VariableValue::Scalar(self.device_clock()),
            "runtime_state" => VariableValue::Scalar(f64::from(self.scheduled_state().code())),
            "robot_mode" => VariableValue::Scalar(7.0),
            "safety_mode" => VariableValue::Scalar(1.0),
            "speed_scaling" | "target_speed_fraction" => VariableValue::Scalar(1.0),
            name => self.signal(name, entry.arity.width()),
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> SimulationProfile {
        SimulationProfile {
            frequency_hz: 10.0,
            idle_secs: 0.5,
            playing_secs: 1.0,
            seed: Some(7),
            ..Default::default()
        }
    }

    async fn step(robot: &mut SimulatedRobot) -> RuntimeState {
        let marker = robot.init_period().await.unwrap();
        let state = robot.runtime_state().unwrap();
        robot.wait_period(marker).await.unwrap();
        state
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_then_playing_cycle() {
        let mut robot = SimulatedRobot::new("localhost", profile());
        let mut states = Vec::new();
        for _ in 0..20 {
            states.push(step(&mut robot).await);
        }
        assert!(states[..5].iter().all(|s| *s == RuntimeState::Stopped));
        assert!(states[5..15].iter().all(|s| *s == RuntimeState::Playing));
        assert!(states[15..20].iter().all(|s| *s == RuntimeState::Stopped));
        assert_eq!(robot.programs_started(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_device_clock_restarts_at_program_start() {
        let mut robot = SimulatedRobot::new("localhost", profile());
        for _ in 0..5 {
            step(&mut robot).await;
        }
        let marker = robot.init_period().await.unwrap();
        assert_eq!(robot.timestamp().unwrap(), 0.0);
        robot.wait_period(marker).await.unwrap();

        let marker = robot.init_period().await.unwrap();
        assert!((robot.timestamp().unwrap() - 0.1).abs() < 1e-9);
        robot.wait_period(marker).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_values_match_catalog_arity() {
        let mut robot = SimulatedRobot::new("localhost", profile());
        let marker = robot.init_period().await.unwrap();
        assert_eq!(robot.fetch("actual_TCP_pose").unwrap().width(), 6);
        assert_eq!(robot.fetch("elbow_position").unwrap().width(), 3);
        assert_eq!(robot.fetch("robot_mode").unwrap(), VariableValue::Scalar(7.0));
        assert!(robot.fetch("not_a_variable").is_err());
        robot.wait_period(marker).await.unwrap();
    }

    #[test]
    fn test_always_failing_fetch() {
        let mut robot = SimulatedRobot::new(
            "localhost",
            SimulationProfile {
                fetch_failure_probability: 1.0,
                ..profile()
            },
        );
        assert!(matches!(
            robot.fetch("actual_q"),
            Err(FetchError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_flicker_inverts_activity() {
        let mut robot = SimulatedRobot::new(
            "localhost",
            SimulationProfile {
                flicker_probability: 1.0,
                ..profile()
            },
        );
        assert_eq!(robot.runtime_state().unwrap(), RuntimeState::Playing);
    }
}
