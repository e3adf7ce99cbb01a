//! # Beacon CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载与验证
//! - 上报 hook 装配与事件驱动
//! - 退出前排空队列

mod cli;
mod commands;
mod error;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::{Cli, Commands};
use commands::{run_info, run_reporter, run_validate};
use observability::BoxedLayer;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Execute command; `run` installs logging itself once the report layer exists
    let result = match &cli.command {
        Commands::Run(args) => run_reporter(&cli, args).await,
        Commands::Validate(args) => {
            init_logging(&cli, Vec::new())?;
            run_validate(args)
        }
        Commands::Info(args) => {
            init_logging(&cli, Vec::new())?;
            run_info(args)
        }
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging based on CLI options
///
/// The verbosity filter applies to console output only; `extra` layers see
/// every event.
fn init_logging(cli: &Cli, extra: Vec<BoxedLayer>) -> Result<()> {
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else {
        let default_level = match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    let mut layers = vec![observability::fmt_layer(cli.log_format.into(), filter)];
    layers.extend(extra);

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(version = env!("CARGO_PKG_VERSION"), "Beacon CLI starting");
    Ok(())
}
