//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// RTDE Recorder - state-gated CSV recorder for robot telemetry
#[derive(Parser, Debug)]
#[command(
    name = "rtde-recorder",
    author,
    version,
    about = "State-gated CSV recorder for robot real-time telemetry",
    long_about = "Samples robot telemetry at a fixed rate and records it to CSV while a program is running.\n\n\
                  Recording starts and stops on debounced program state changes; every session gets \n\
                  its own timestamped files, rotated by size or duration."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "RTDE_RECORDER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "RTDE_RECORDER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the recorder until interrupted
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display resolved configuration, columns and the variable catalog
    Info(InfoArgs),

    /// List recorded sessions in a directory
    Sessions(SessionsArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); defaults apply when omitted
    #[arg(short, long, env = "RTDE_RECORDER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override robot address
    #[arg(long, env = "RTDE_ROBOT_IP")]
    pub robot_ip: Option<String>,

    /// Override output path template (e.g. data/robot_data.csv)
    #[arg(short, long, env = "RTDE_RECORDER_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Override sampling frequency in Hz
    #[arg(short, long, env = "RTDE_RECORDER_FREQUENCY")]
    pub frequency: Option<f64>,

    /// Variables to record, comma separated
    #[arg(long, value_delimiter = ',')]
    pub variables: Option<Vec<String>>,

    /// Side-channel variables file
    #[arg(long)]
    pub variables_file: Option<PathBuf>,

    /// Rotate segments at this size in MB (0 = no size limit)
    #[arg(long)]
    pub max_file_size: Option<f64>,

    /// Rotate segments after this many minutes (0 = no duration limit)
    #[arg(long)]
    pub max_duration: Option<f64>,

    /// Telemetry source
    #[arg(long, value_enum)]
    pub source: Option<SourceArg>,

    /// Replay a recorded CSV segment (implies --source replay)
    #[arg(long)]
    pub replay: Option<PathBuf>,

    /// Stop after this many sampling periods (0 = unlimited)
    #[arg(long, default_value = "0", env = "RTDE_RECORDER_MAX_SAMPLES")]
    pub max_samples: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "RTDE_RECORDER_METRICS_PORT")]
    pub metrics_port: u16,

    /// How to show the periodic status line
    #[arg(long, value_enum, default_value = "terminal")]
    pub status: StatusArg,

    /// Validate configuration and exit without recording
    #[arg(long)]
    pub dry_run: bool,

    /// Simulated robot: seconds idle between programs
    #[arg(long, default_value = "5")]
    pub sim_idle_secs: f64,

    /// Simulated robot: seconds each program runs
    #[arg(long, default_value = "30")]
    pub sim_playing_secs: f64,

    /// Simulated robot: chance of a one-poll state flicker
    #[arg(long, default_value = "0")]
    pub sim_flicker: f64,

    /// Simulated robot: chance of a transient variable read failure
    #[arg(long, default_value = "0")]
    pub sim_fetch_failures: f64,

    /// Simulated robot: RNG seed
    #[arg(long)]
    pub sim_seed: Option<u64>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "recorder.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; defaults apply when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show the expanded CSV header
    #[arg(long)]
    pub columns: bool,

    /// List every catalog variable
    #[arg(long)]
    pub catalog: bool,
}

/// Arguments for the `sessions` command
#[derive(Parser, Debug)]
pub struct SessionsArgs {
    /// Directory holding recorded segments
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}

/// Telemetry source selection
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceArg {
    /// Simulated robot program cycle
    Simulated,
    /// Replay a recorded segment
    Replay,
}

impl From<SourceArg> for contracts::SourceKind {
    fn from(source: SourceArg) -> Self {
        match source {
            SourceArg::Simulated => contracts::SourceKind::Simulated,
            SourceArg::Replay => contracts::SourceKind::Replay,
        }
    }
}

/// Status line output
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusArg {
    /// Single refreshed terminal line
    #[default]
    Terminal,
    /// Debug log events
    Log,
    /// No status line
    Off,
}

impl From<StatusArg> for recorder::StatusOutput {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Terminal => recorder::StatusOutput::Terminal,
            StatusArg::Log => recorder::StatusOutput::Log,
            StatusArg::Off => recorder::StatusOutput::Off,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args_parse() {
        let cli = Cli::try_parse_from([
            "rtde-recorder",
            "run",
            "--robot-ip",
            "10.0.0.5",
            "-f",
            "125",
            "--variables",
            "timestamp,actual_q",
            "--max-file-size",
            "50",
            "--replay",
            "old.csv",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.robot_ip.as_deref(), Some("10.0.0.5"));
        assert_eq!(args.frequency, Some(125.0));
        assert_eq!(
            args.variables,
            Some(vec!["timestamp".to_string(), "actual_q".to_string()])
        );
        assert_eq!(args.max_file_size, Some(50.0));
        assert_eq!(args.replay, Some(PathBuf::from("old.csv")));
        assert_eq!(args.status, StatusArg::Terminal);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["rtde-recorder", "-q", "-v", "sessions"]).is_err());
    }
}
