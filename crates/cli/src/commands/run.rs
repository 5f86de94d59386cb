//! `run` command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use contracts::{is_known, ordered_columns, RecorderConfig, SourceKind};
use telemetry::SimulationProfile;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_recorder(args: &RunArgs) -> Result<()> {
    let mut config = load_or_default(args.config.as_deref())?;

    // Apply CLI overrides
    apply_overrides(&mut config, args);
    config_loader::ConfigLoader::validate(&config).context("Invalid configuration")?;

    let selection = config_loader::resolve_variables(&config.recording);
    for name in selection.names() {
        if !is_known(name) {
            warn!(variable = %name, "Unknown variable; it will be recorded as one placeholder column");
        }
    }

    info!(
        robot = %config.robot.address,
        output = %config.recording.output.display(),
        frequency_hz = config.recording.frequency_hz,
        variables = selection.variables.len(),
        origin = %selection.origin,
        source = ?config.source.kind,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config, &selection);
        return Ok(());
    }

    // Build pipeline configuration
    let pipeline_config = PipelineConfig {
        recorder: config,
        selection,
        max_samples: if args.max_samples == 0 {
            None
        } else {
            Some(args.max_samples)
        },
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
        status_output: args.status.into(),
        simulation: SimulationProfile {
            idle_secs: args.sim_idle_secs,
            playing_secs: args.sim_playing_secs,
            flicker_probability: args.sim_flicker,
            fetch_failure_probability: args.sim_fetch_failures,
            seed: args.sim_seed,
            ..Default::default()
        },
    };

    info!("Starting recorder...");
    let stats = Pipeline::new(pipeline_config)
        .run(setup_shutdown_signal())
        .await
        .context("Recorder execution failed")?;

    info!(
        samples = stats.samples,
        sessions = stats.metrics.sessions,
        segments = stats.metrics.segments,
        duration_secs = stats.duration.as_secs_f64(),
        "Recorder finished"
    );
    stats.print_summary();

    Ok(())
}

/// Load a configuration file, or defaults when no path is given
pub(crate) fn load_or_default(path: Option<&Path>) -> Result<RecorderConfig> {
    let Some(path) = path else {
        info!("No configuration file given, using defaults");
        return Ok(RecorderConfig::default());
    };

    info!(config = %path.display(), "Loading configuration");
    if !path.exists() {
        return Err(CliError::config_not_found(path).into());
    }

    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

/// CLI flags take precedence over the configuration file
fn apply_overrides(config: &mut RecorderConfig, args: &RunArgs) {
    if let Some(ref address) = args.robot_ip {
        info!(address = %address, "Overriding robot address from CLI");
        config.robot.address = address.clone();
    }
    if let Some(ref output) = args.output {
        config.recording.output = output.clone();
    }
    if let Some(frequency) = args.frequency {
        config.recording.frequency_hz = frequency;
    }
    if let Some(ref variables) = args.variables {
        config.recording.variables = Some(variables.clone());
    }
    if let Some(ref file) = args.variables_file {
        config.recording.variables_file = file.clone();
    }
    if let Some(size) = args.max_file_size {
        config.rotation.max_file_size_mb = Some(size);
    }
    if let Some(minutes) = args.max_duration {
        config.rotation.max_duration_minutes = Some(minutes);
    }
    if let Some(source) = args.source {
        config.source.kind = source.into();
    }
    if let Some(ref replay) = args.replay {
        config.source.kind = SourceKind::Replay;
        config.source.replay_path = Some(replay.clone());
    }
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("Received shutdown signal, closing open segment...");
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &RecorderConfig, selection: &config_loader::VariableSelection) {
    println!("\n=== Configuration Summary ===\n");
    println!("Robot: {}", config.robot.address);
    println!("\nRecording:");
    println!("  Output template: {}", config.recording.output.display());
    println!("  Frequency: {} Hz", config.recording.frequency_hz);
    println!(
        "  Variables ({}, from {}): {}",
        selection.variables.len(),
        selection.origin,
        selection.names().join(", ")
    );
    println!(
        "  Columns: {}",
        ordered_columns(&selection.variables).len()
    );

    println!("\nRotation:");
    match config.rotation.max_file_size_mb.filter(|mb| *mb > 0.0) {
        Some(mb) => println!("  Max file size: {} MB", mb),
        None => println!("  Max file size: unlimited"),
    }
    match config.rotation.max_duration_minutes.filter(|min| *min > 0.0) {
        Some(min) => println!("  Max duration: {} min", min),
        None => println!("  Max duration: unlimited"),
    }

    println!("\nDebounce:");
    println!(
        "  Start/stop thresholds: {}/{}",
        config.debounce.start_threshold, config.debounce.stop_threshold
    );
    println!(
        "  Check every: {} periods",
        config.debounce.check_every(config.recording.frequency_hz)
    );

    println!("\nSource: {:?}", config.source.kind);
    if let Some(ref path) = config.source.replay_path {
        println!("  Replay file: {}", path.display());
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::path::PathBuf;

    fn run_args(argv: &[&str]) -> RunArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Commands::Run(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_overrides_config() {
        let mut config = RecorderConfig::default();
        let args = run_args(&[
            "rtde-recorder",
            "run",
            "-o",
            "data/arm.csv",
            "--max-duration",
            "0",
            "--replay",
            "old.csv",
        ]);
        apply_overrides(&mut config, &args);

        assert_eq!(config.recording.output, PathBuf::from("data/arm.csv"));
        assert_eq!(config.rotation.max_duration_minutes, Some(0.0));
        assert!(!config.rotation.is_active());
        assert_eq!(config.source.kind, SourceKind::Replay);
        assert_eq!(config.source.replay_path, Some(PathBuf::from("old.csv")));
        assert_eq!(config.recording.frequency_hz, 250.0);
    }

    #[test]
    fn test_missing_config_is_reported() {
        let err = load_or_default(Some(Path::new("/nonexistent/recorder.toml"))).unwrap_err();
        assert!(err.to_string().contains("Configuration file not found"));
        assert!(load_or_default(None).is_ok());
    }
}
