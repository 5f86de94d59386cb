//! Recording pipeline orchestrator - builds the telemetry source and drives
//! the session controller until shutdown.

use std::future::Future;
use std::time::Instant;

use anyhow::{Context, Result};
use config_loader::VariableSelection;
use contracts::{RecorderConfig, SourceKind, TelemetrySource};
use recorder::{ControllerConfig, SessionController, StatusOutput};
use telemetry::{ReplaySource, SimulatedRobot, SimulationProfile};
use tracing::info;

use super::RunStats;
use crate::error::CliError;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated recorder configuration (CLI overrides applied)
    pub recorder: RecorderConfig,

    /// Resolved variable list
    pub selection: VariableSelection,

    /// Maximum number of sampling periods (None = unlimited)
    pub max_samples: Option<u64>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Status line output
    pub status_output: StatusOutput,

    /// Simulated robot behaviour (simulated source only)
    pub simulation: SimulationProfile,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` completes or the sample limit is reached
    pub async fn run<F>(self, shutdown: F) -> Result<RunStats>
    where
        F: Future<Output = ()>,
    {
        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let recorder = &self.config.recorder;
        match recorder.source.kind {
            SourceKind::Simulated => {
                let profile = SimulationProfile {
                    frequency_hz: recorder.recording.frequency_hz,
                    ..self.config.simulation.clone()
                };
                info!(
                    address = %recorder.robot.address,
                    idle_secs = profile.idle_secs,
                    playing_secs = profile.playing_secs,
                    "Running against SIMULATED robot"
                );
                let source = SimulatedRobot::new(&recorder.robot.address, profile);
                self.record(source, shutdown).await
            }
            SourceKind::Replay => {
                let path = recorder
                    .source
                    .replay_path
                    .as_deref()
                    .context("replay source requires a replay path")?;
                if !path.exists() {
                    return Err(CliError::replay_not_found(path).into());
                }

                info!(path = %path.display(), "Running in REPLAY mode");
                let source = ReplaySource::load(path, recorder.recording.frequency_hz)
                    .with_context(|| format!("Failed to load replay file {}", path.display()))?;
                self.record(source, shutdown).await
            }
        }
    }

    /// Drive one source through the session controller
    async fn record<S, F>(&self, source: S, shutdown: F) -> Result<RunStats>
    where
        S: TelemetrySource,
        F: Future<Output = ()>,
    {
        let source_name = source.name().to_string();
        let controller_config = ControllerConfig::from_config(
            &self.config.recorder,
            self.config.selection.variables.clone(),
        )
        .with_status_output(self.config.status_output);

        info!(
            source = %source_name,
            output = %self.config.recorder.recording.output.display(),
            frequency_hz = self.config.recorder.recording.frequency_hz,
            variables = self.config.selection.variables.len(),
            origin = %self.config.selection.origin,
            "Recorder configured"
        );

        let start_time = Instant::now();
        let mut controller = SessionController::new(source, controller_config);
        let outcome = controller.run(shutdown, self.config.max_samples).await;

        let stats = RunStats {
            source: source_name,
            stop: outcome.as_ref().ok().map(|report| report.stop),
            samples: controller.samples(),
            duration: start_time.elapsed(),
            segment_paths: controller.segments().opened_segments().to_vec(),
            metrics: controller.stats().summary(),
        };

        match outcome {
            Ok(_) => Ok(stats),
            Err(e) => {
                // 异常退出也输出摘要
                stats.print_summary();
                Err(CliError::recording_aborted(stats.samples, e.to_string()).into())
            }
        }
    }
}
