//! Session Controller
//!
//! Drives one telemetry source at a fixed rate and owns every piece of loop
//! state: the debounce window, the segment manager with its open file, the
//! check cadence and the run statistics.
//!
//! ## Per-period order
//!
//! 1. `init_period` (suspension point)
//! 2. on check boundaries: read the runtime state, feed the debouncer, act on
//!    a stable transition, then evaluate rotation triggers
//! 3. while recording: write one row
//! 4. metrics, statistics and status line
//! 5. `wait_period` (suspension point)
//!
//! Cancellation can only happen at the two suspension points, so a row is
//! never half written. [`SessionController::run`] closes the open segment on
//! every exit path.

use std::future::Future;
use std::path::PathBuf;

use chrono::Local;
use contracts::{
    DebounceConfig, IterationReport, RecorderConfig, RotationPolicy, RuntimeState, SessionEvent,
    TelemetrySource, VariableSpec,
};
use observability::{record_iteration, record_session_event, MetricsSummary, RecorderMetricsAggregator};
use tracing::{debug, error, info, instrument, warn};

use crate::debounce::{Debouncer, Transition};
use crate::error::{RecorderError, Result};
use crate::segment::SegmentManager;
use crate::status::{SegmentStatus, StatusLine, StatusOutput, StatusReporter};

/// Controller settings
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Sampling frequency (Hz)
    pub frequency_hz: f64,
    /// Output path template
    pub output: PathBuf,
    /// Recorded variables, in column order
    pub variables: Vec<VariableSpec>,
    pub rotation: RotationPolicy,
    pub debounce: DebounceConfig,
    /// Periods between status lines (0 = never)
    pub status_every: u64,
    pub status_output: StatusOutput,
}

impl ControllerConfig {
    /// Build from a loaded configuration and a resolved variable list
    pub fn from_config(config: &RecorderConfig, variables: Vec<VariableSpec>) -> Self {
        Self {
            frequency_hz: config.recording.frequency_hz,
            output: config.recording.output.clone(),
            variables,
            rotation: config.rotation,
            debounce: config.debounce,
            status_every: config.recording.status_every,
            status_output: StatusOutput::default(),
        }
    }

    /// Select how status lines are shown
    pub fn with_status_output(mut self, output: StatusOutput) -> Self {
        self.status_output = output;
        self
    }
}

/// Logical recorder state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ControllerState {
    /// No segment open
    #[default]
    Waiting,
    /// A segment is open and rows are being written
    Recording,
}

/// Why [`SessionController::run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The shutdown future completed
    Interrupted,
    /// The requested number of samples was reached
    SampleLimit,
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub stop: StopReason,
    /// Completed sampling periods
    pub samples: u64,
    pub summary: MetricsSummary,
}

/// Session Controller
pub struct SessionController<S: TelemetrySource> {
    source: S,
    debouncer: Debouncer,
    segments: SegmentManager,
    state: ControllerState,
    /// Check cadence in periods
    check_every: u64,
    /// Completed periods
    tick: u64,
    last_observed: Option<RuntimeState>,
    stats: RecorderMetricsAggregator,
    status: StatusReporter,
    events: Vec<SessionEvent>,
}

impl<S: TelemetrySource> SessionController<S> {
    /// Create a controller; nothing is opened until the first stable PLAYING
    pub fn new(source: S, config: ControllerConfig) -> Self {
        let check_every = config.debounce.check_every(config.frequency_hz);
        debug!(
            source = source.name(),
            check_every,
            variables = config.variables.len(),
            "Session controller created"
        );

        Self {
            debouncer: Debouncer::new(&config.debounce),
            segments: SegmentManager::new(config.output, config.rotation, config.variables),
            status: StatusReporter::new(config.status_output, config.status_every),
            source,
            state: ControllerState::Waiting,
            check_every,
            tick: 0,
            last_observed: None,
            stats: RecorderMetricsAggregator::new(),
            events: Vec::new(),
        }
    }

    /// Telemetry source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Logical state
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Completed sampling periods
    pub fn samples(&self) -> u64 {
        self.tick
    }

    /// Check cadence in periods
    pub fn check_every(&self) -> u64 {
        self.check_every
    }

    /// Run statistics
    pub fn stats(&self) -> &RecorderMetricsAggregator {
        &self.stats
    }

    /// Segment manager
    pub fn segments(&self) -> &SegmentManager {
        &self.segments
    }

    /// Session events so far, oldest first
    pub fn events(&self) -> &[SessionEvent] {
        &self.events
    }

    /// Run one sampling period
    ///
    /// # Errors
    /// Only a telemetry link failure is returned; segment failures end the
    /// session and the loop continues.
    pub async fn step(&mut self) -> Result<IterationReport> {
        let marker = self.source.init_period().await?;
        let started = std::time::Instant::now();

        let mut report = IterationReport {
            tick: self.tick,
            ..Default::default()
        };

        if self.tick % self.check_every == 0 {
            self.check_state(&mut report);
            if self.state == ControllerState::Recording {
                self.check_rotation();
            }
        }

        if self.state == ControllerState::Recording {
            match self.segments.write_row(&mut self.source) {
                Ok(row) => {
                    report.row_bytes = Some(row.bytes);
                    report.placeholders = row.placeholders;
                }
                Err(e) => self.on_segment_failure(e),
            }
        }

        report.recording = self.state == ControllerState::Recording;
        report.work_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.stats.update(&report);
        record_iteration(&report);

        self.tick += 1;
        if self.status.is_due(self.tick) {
            let line = self.status_line();
            self.status.emit(&line);
        }

        self.source.wait_period(marker).await?;
        Ok(report)
    }

    /// Run until `shutdown` completes, `max_samples` periods have run, or the
    /// telemetry link fails
    ///
    /// The open segment is closed on every path.
    #[instrument(name = "controller_run", skip(self, shutdown), fields(source = self.source.name()))]
    pub async fn run<F>(&mut self, shutdown: F, max_samples: Option<u64>) -> Result<RunReport>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(check_every = self.check_every, ?max_samples, "Recorder loop started");

        let outcome = loop {
            if max_samples.is_some_and(|max| self.tick >= max) {
                break Ok(StopReason::SampleLimit);
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => break Ok(StopReason::Interrupted),
                result = self.step() => {
                    if let Err(e) = result {
                        break Err(e);
                    }
                }
            }
        };

        let finished = self.finish();
        let stop = match outcome {
            Ok(stop) => stop,
            Err(e) => {
                error!(error = %e, samples = self.tick, "Telemetry link lost; recorder stopped");
                return Err(e);
            }
        };
        finished?;

        info!(?stop, samples = self.tick, "Recorder loop finished");
        Ok(RunReport {
            stop,
            samples: self.tick,
            summary: self.stats.summary(),
        })
    }

    /// Close whatever segment is open
    pub fn finish(&mut self) -> Result<()> {
        self.status.finish();
        if self.state != ControllerState::Recording {
            return Ok(());
        }

        self.state = ControllerState::Waiting;
        self.debouncer.force_idle();
        match self.segments.close_session() {
            Ok(Some(closed)) => {
                self.emit(SessionEvent::Stopped {
                    session: closed.session.timestamp,
                    segments: closed.session.segments,
                });
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => {
                let session = self.current_session();
                error!(error = %e, path = ?e.segment_path(), "Segment could not be closed");
                self.emit(SessionEvent::SegmentFailed { session });
                Err(e)
            }
        }
    }

    fn check_state(&mut self, report: &mut IterationReport) {
        let state = match self.source.runtime_state() {
            Ok(state) => state,
            Err(e) => {
                report.state_read_failed = true;
                if self.state == ControllerState::Recording {
                    warn!(error = %e, tick = self.tick, "Runtime state unreadable; still recording");
                } else {
                    debug!(error = %e, tick = self.tick, "Runtime state unreadable");
                }
                return;
            }
        };

        report.observed_state = Some(state);
        self.last_observed = Some(state);

        match self.debouncer.observe(state) {
            Some(Transition::StartRecording) => self.start_session(),
            Some(Transition::StopRecording) => self.stop_session(),
            None => {}
        }
    }

    fn start_session(&mut self) {
        let session = match self.segments.open_session(Local::now()) {
            Ok(session) => session.timestamp.clone(),
            Err(e) => return self.on_segment_failure(e),
        };

        self.state = ControllerState::Recording;
        self.emit(SessionEvent::Started { session });
    }

    fn stop_session(&mut self) {
        match self.segments.close_session() {
            Ok(Some(closed)) => {
                self.state = ControllerState::Waiting;
                self.emit(SessionEvent::Stopped {
                    session: closed.session.timestamp,
                    segments: closed.session.segments,
                });
            }
            Ok(None) => self.state = ControllerState::Waiting,
            Err(e) => self.on_segment_failure(e),
        }
    }

    fn check_rotation(&mut self) {
        let Some(reason) = self.segments.rotation_due() else {
            return;
        };

        let (session, file_number) = match self.segments.rotate(reason) {
            Ok(session) => (session.timestamp.clone(), session.file_number),
            Err(e) => return self.on_segment_failure(e),
        };
        self.emit(SessionEvent::Rotated {
            session,
            reason,
            file_number,
        });
    }

    /// End the session after a segment I/O failure
    ///
    /// The debouncer is reset, so recording resumes only after a full start
    /// window with a brand-new session.
    fn on_segment_failure(&mut self, e: RecorderError) {
        let session = self.current_session();
        error!(
            error = %e,
            path = ?e.segment_path(),
            session = %session,
            "SEGMENT FAILURE: recording stopped for this session"
        );

        self.segments.abandon_session();
        self.state = ControllerState::Waiting;
        self.debouncer.force_idle();
        self.emit(SessionEvent::SegmentFailed { session });
    }

    fn current_session(&self) -> String {
        self.segments
            .session()
            .map(|s| s.timestamp.clone())
            .unwrap_or_default()
    }

    fn emit(&mut self, event: SessionEvent) {
        record_session_event(&event);
        self.stats.on_event(&event);
        self.events.push(event);
    }

    fn status_line(&self) -> StatusLine {
        let segment = self.segments.segment().map(|segment| SegmentStatus {
            file_name: segment
                .path()
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size_bytes: segment.size_bytes(),
            elapsed: segment.elapsed(),
        });

        StatusLine {
            samples: self.tick,
            last_state: self.last_observed,
            segment,
        }
    }
}
