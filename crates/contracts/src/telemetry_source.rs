//! TelemetrySource trait - the capability the recorder consumes
//!
//! Mirrors the device real-time interface: a fixed-rate period primitive,
//! a program state query, a device-relative clock and one getter per variable.

use crate::{ContractError, FetchError, RuntimeState};

/// Opaque marker returned by [`LocalTelemetrySource::init_period`]
///
/// Must be handed back to the matching `wait_period` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodMarker {
    /// Zero-based period index since the source started
    pub tick: u64,
}

/// A fetched value: one scalar or a fixed-length vector
#[derive(Debug, Clone, PartialEq)]
pub enum VariableValue {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl VariableValue {
    /// Number of scalar fields
    pub fn width(&self) -> usize {
        match self {
            VariableValue::Scalar(_) => 1,
            VariableValue::Vector(values) => values.len(),
        }
    }

    /// Scalar fields in order
    pub fn as_slice(&self) -> &[f64] {
        match self {
            VariableValue::Scalar(value) => std::slice::from_ref(value),
            VariableValue::Vector(values) => values,
        }
    }
}

impl From<f64> for VariableValue {
    fn from(value: f64) -> Self {
        VariableValue::Scalar(value)
    }
}

impl From<Vec<f64>> for VariableValue {
    fn from(values: Vec<f64>) -> Self {
        VariableValue::Vector(values)
    }
}

/// Telemetry source trait
///
/// All sources (simulated, replayed, scripted) implement this trait. The
/// recorder calls `init_period` and `wait_period` exactly once per iteration;
/// they are the only suspension points of the sampling loop.
#[trait_variant::make(TelemetrySource: Send)]
pub trait LocalTelemetrySource {
    /// Source name (used for logging)
    fn name(&self) -> &str;

    /// Block until the next fixed-rate period is due
    ///
    /// # Errors
    /// Returns a link error if the source can no longer be driven
    async fn init_period(&mut self) -> Result<PeriodMarker, ContractError>;

    /// Block for whatever remains of the period started by `marker`
    async fn wait_period(&mut self, marker: PeriodMarker) -> Result<(), ContractError>;

    /// Current program state
    fn runtime_state(&mut self) -> Result<RuntimeState, FetchError>;

    /// Device-relative clock in seconds
    fn timestamp(&mut self) -> Result<f64, FetchError>;

    /// Current value of a named variable
    fn fetch(&mut self, variable: &str) -> Result<VariableValue, FetchError>;
}
