//! # Contracts
//!
//! Frozen interface contracts shared by every recorder crate: the variable
//! catalog, the telemetry source capability, configuration and errors.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - The telemetry source reports a device-relative clock (seconds, f64) that
//!   restarts from an arbitrary zero for every program run
//! - The recorder anchors that clock to wall-clock time once per session

mod catalog;
mod config;
mod error;
mod report;
mod runtime;
mod telemetry_source;

pub use catalog::*;
pub use config::*;
pub use error::*;
pub use report::*;
pub use runtime::*;
pub use telemetry_source::{LocalTelemetrySource, PeriodMarker, TelemetrySource, VariableValue};
