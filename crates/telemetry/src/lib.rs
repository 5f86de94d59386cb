//! # Telemetry
//!
//! Telemetry sources that drive the recorder loop.
//!
//! Responsibilities:
//! - Fixed-rate period pacing shared by every source
//! - Simulated robot for running without a controller
//! - Replay of previously recorded segments
//! - Scripted source with failure injection for tests

mod period;
mod replay;
mod scripted;
mod simulated;

pub use period::{PeriodClock, MAX_PERIOD, MIN_PERIOD};
pub use replay::ReplaySource;
pub use scripted::{ScriptedConfig, ScriptedSource};
pub use simulated::{SimulatedRobot, SimulationProfile};
