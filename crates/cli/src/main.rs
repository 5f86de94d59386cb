//! # RTDE Recorder CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载与验证
//! - 录制循环编排与生命周期管理
//! - 优雅关闭处理

mod cli;
mod commands;
mod error;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_info, run_recorder, run_sessions, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging based on CLI options
    observability::init_with_config(observability_config(&cli))?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "RTDE Recorder CLI starting"
    );

    // Execute command
    let result = match &cli.command {
        Commands::Run(args) => run_recorder(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
        Commands::Sessions(args) => run_sessions(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Logging setup from CLI options; the metrics exporter is installed by `run`
fn observability_config(cli: &Cli) -> ObservabilityConfig {
    ObservabilityConfig::default()
        .with_verbosity(cli.verbose, cli.quiet)
        .with_log_format(cli.log_format.into())
}
