//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{is_known, row_width, RecorderConfig, SourceKind};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    robot_address: String,
    output: String,
    frequency_hz: f64,
    variable_origin: String,
    variable_count: usize,
    column_count: usize,
    rotation_active: bool,
    source: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let selection = config_loader::resolve_variables(&config.recording);
            let warnings = collect_warnings(&config, &selection.names());

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    robot_address: config.robot.address.clone(),
                    output: config.recording.output.display().to_string(),
                    frequency_hz: config.recording.frequency_hz,
                    variable_origin: selection.origin.to_string(),
                    variable_count: selection.variables.len(),
                    column_count: row_width(&selection.variables),
                    rotation_active: config.rotation.is_active(),
                    source: format!("{:?}", config.source.kind),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &RecorderConfig, variables: &[&str]) -> Vec<String> {
    let mut warnings = Vec::new();

    for name in variables.iter().filter(|name| !is_known(name)) {
        warnings.push(format!(
            "Unknown variable '{}' - it will be recorded as one placeholder column",
            name
        ));
    }

    if !variables.contains(&contracts::TIMESTAMP_VARIABLE) {
        warnings.push("No 'timestamp' variable - rows will carry no time column".to_string());
    }

    if !config.rotation.is_active() {
        warnings.push("Rotation disabled - each session is written to a single file".to_string());
    }

    if config.source.kind == SourceKind::Replay {
        if let Some(ref path) = config.source.replay_path {
            if !path.exists() {
                warnings.push(format!("Replay file '{}' does not exist yet", path.display()));
            }
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Robot: {}", summary.robot_address);
            println!("  Output: {}", summary.output);
            println!("  Frequency: {} Hz", summary.frequency_hz);
            println!(
                "  Variables: {} ({} columns, from {})",
                summary.variable_count, summary.column_count, summary.variable_origin
            );
            println!("  Rotation active: {}", summary.rotation_active);
            println!("  Source: {}", summary.source);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_warnings_for_unknown_variables() {
        let config = RecorderConfig::default();
        let warnings = collect_warnings(&config, &["timestamp", "actual_q", "joint_magic"]);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("joint_magic"));
    }

    #[test]
    fn test_invalid_frequency_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("recorder.toml");
        std::fs::write(&path, "[recording]\nfrequency_hz = 0.0\n").unwrap();

        let result = validate_config(&ValidateArgs {
            config: path,
            json: true,
        });
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("frequency_hz"));
    }

    #[test]
    fn test_missing_file() {
        let result = validate_config(&ValidateArgs {
            config: PathBuf::from("/nonexistent/recorder.toml"),
            json: false,
        });
        assert!(!result.valid);
        assert!(result.error.unwrap().starts_with("File not found"));
    }
}
