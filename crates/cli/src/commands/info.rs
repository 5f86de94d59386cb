//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{ordered_columns, RecorderConfig, CATALOG};
use serde::Serialize;
use tracing::info;

use super::run::load_or_default;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    robot_address: String,
    recording: RecordingInfo,
    rotation: RotationInfo,
    debounce: DebounceInfo,
    source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    replay_path: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    columns: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    catalog: Vec<CatalogInfo>,
}

#[derive(Serialize)]
struct RecordingInfo {
    output: String,
    frequency_hz: f64,
    variable_origin: String,
    variables: Vec<String>,
    status_every: u64,
}

#[derive(Serialize)]
struct RotationInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_file_size_mb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_duration_minutes: Option<f64>,
}

#[derive(Serialize)]
struct DebounceInfo {
    start_threshold: u32,
    stop_threshold: u32,
    check_interval_s: f64,
    check_every_periods: u64,
}

#[derive(Serialize)]
struct CatalogInfo {
    name: String,
    width: usize,
    description: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!("Loading configuration info");

    let config = load_or_default(args.config.as_deref())?;
    let info = build_config_info(&config, args);

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(config: &RecorderConfig, args: &InfoArgs) -> ConfigInfo {
    let selection = config_loader::resolve_variables(&config.recording);

    let columns = if args.columns {
        ordered_columns(&selection.variables)
    } else {
        Vec::new()
    };

    let catalog = if args.catalog {
        CATALOG
            .iter()
            .map(|entry| CatalogInfo {
                name: entry.name.to_string(),
                width: entry.arity.width(),
                description: entry.description.to_string(),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        robot_address: config.robot.address.clone(),
        recording: RecordingInfo {
            output: config.recording.output.display().to_string(),
            frequency_hz: config.recording.frequency_hz,
            variable_origin: selection.origin.to_string(),
            variables: selection.names().into_iter().map(str::to_string).collect(),
            status_every: config.recording.status_every,
        },
        rotation: RotationInfo {
            max_file_size_mb: config.rotation.max_file_size_mb.filter(|mb| *mb > 0.0),
            max_duration_minutes: config.rotation.max_duration_minutes.filter(|m| *m > 0.0),
        },
        debounce: DebounceInfo {
            start_threshold: config.debounce.start_threshold,
            stop_threshold: config.debounce.stop_threshold,
            check_interval_s: config.debounce.check_interval_s,
            check_every_periods: config.debounce.check_every(config.recording.frequency_hz),
        },
        source: format!("{:?}", config.source.kind),
        replay_path: config
            .source
            .replay_path
            .as_ref()
            .map(|p| p.display().to_string()),
        columns,
        catalog,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("\n=== RTDE Recorder Configuration ===\n");
    println!("Robot: {}", info.robot_address);

    println!("\nRecording:");
    println!("  Output template: {}", info.recording.output);
    println!("  Frequency: {} Hz", info.recording.frequency_hz);
    println!("  Status every: {} periods", info.recording.status_every);
    println!(
        "  Variables ({}, from {}):",
        info.recording.variables.len(),
        info.recording.variable_origin
    );
    for name in &info.recording.variables {
        println!("    - {}", name);
    }

    println!("\nRotation:");
    match info.rotation.max_file_size_mb {
        Some(mb) => println!("  Max file size: {} MB", mb),
        None => println!("  Max file size: unlimited"),
    }
    match info.rotation.max_duration_minutes {
        Some(min) => println!("  Max duration: {} min", min),
        None => println!("  Max duration: unlimited"),
    }

    println!("\nDebounce:");
    println!(
        "  Thresholds: start {} / stop {}",
        info.debounce.start_threshold, info.debounce.stop_threshold
    );
    println!(
        "  Check interval: {}s ({} periods)",
        info.debounce.check_interval_s, info.debounce.check_every_periods
    );

    println!("\nSource: {}", info.source);
    if let Some(ref path) = info.replay_path {
        println!("  Replay file: {}", path);
    }

    if !info.columns.is_empty() {
        println!("\nColumns ({}):", info.columns.len());
        println!("  {}", info.columns.join(","));
    }

    if !info.catalog.is_empty() {
        println!("\nVariable catalog ({} entries):", info.catalog.len());
        for entry in &info.catalog {
            println!("  {:<28} x{}  {}", entry.name, entry.width, entry.description);
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_expand_vectors() {
        let mut config = RecorderConfig::default();
        config.recording.variables = Some(vec!["timestamp".into(), "elbow_position".into()]);
        let info = build_config_info(
            &config,
            &InfoArgs {
                config: None,
                json: true,
                columns: true,
                catalog: false,
            },
        );

        assert_eq!(
            info.columns,
            vec![
                "timestamp",
                "elbow_position_0",
                "elbow_position_1",
                "elbow_position_2"
            ]
        );
        assert!(info.catalog.is_empty());
        assert_eq!(info.recording.variable_origin, "explicit list");
    }
}
