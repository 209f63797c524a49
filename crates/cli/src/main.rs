//! # liftlog
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 实时录制设备数据到持久化样本日志
//! - 对已录制日志进行动作分段与杠铃轨迹估计
//! - 配置验证

mod cli;
mod commands;
mod error;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_record, run_reps, run_trajectory, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    observability::init_with_config(ObservabilityConfig {
        log_format: cli.log_format.into(),
        metrics_port: cli.metrics_port,
        default_log_level: cli.log_level().to_string(),
    })?;

    info!(version = env!("CARGO_PKG_VERSION"), "liftlog starting");

    let result = match &cli.command {
        Commands::Record(args) => run_record(args).await,
        Commands::Reps(args) => run_reps(args),
        Commands::Trajectory(args) => run_trajectory(args),
        Commands::Validate(args) => run_validate(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}
