//! # Recorder
//!
//! Recording core: debounces the runtime state, opens and rotates CSV
//! segments, anchors the device clock per session and drives the fixed-rate
//! sampling loop.
//!
//! ## 使用示例
//!
//! ```ignore
//! use recorder::{ControllerConfig, SessionController};
//!
//! let config = ControllerConfig::from_config(&recorder_config, variables);
//! let mut controller = SessionController::new(source, config);
//! let report = controller.run(shutdown_signal(), None).await?;
//! println!("{}", report.summary);
//! ```

mod clock;
mod controller;
mod csv;
mod debounce;
mod error;
mod segment;
mod status;

pub use clock::{wall_clock_now, TimestampAnchor};
pub use controller::{ControllerConfig, ControllerState, RunReport, SessionController, StopReason};
pub use csv::{format_cell, header_line, render_row, RenderedRow, PLACEHOLDER};
pub use debounce::{DebounceWindow, Debouncer, Transition};
pub use error::{RecorderError, Result};
pub use segment::{
    evaluate, ClosedSegment, ClosedSession, FileSegment, RowOutcome, SegmentManager, SegmentName,
    Session, SESSION_TIMESTAMP_FORMAT,
};
pub use status::{SegmentStatus, StatusLine, StatusOutput, StatusReporter};
