//! `run` command implementation.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};

use contracts::ReporterConfig;
use observability::BoxedLayer;
use report_hook::{setup_reporting, ReportGuard};

use crate::cli::{Cli, EventLevel, RunArgs};
use crate::commands::load_config;

/// Execute the `run` command
///
/// Logging is initialized here rather than in `main` because the report
/// layer can only be built once the configuration is known.
pub async fn run_reporter(cli: &Cli, args: &RunArgs) -> Result<()> {
    let mut config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    apply_overrides(&mut config, args)?;

    if args.dry_run {
        crate::init_logging(cli, Vec::new())?;
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    let (layer, guard) = setup_reporting(&config)
        .await
        .context("Failed to start reporter")?;
    let extra: Vec<BoxedLayer> = layer
        .into_iter()
        .map(|layer| Box::new(layer) as BoxedLayer)
        .collect();
    crate::init_logging(cli, extra)?;

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    info!(
        environment = %config.reporter.environment,
        sink = %config.sink.name,
        sink_type = ?config.sink.sink_type,
        queue_capacity = config.sink.queue_capacity,
        reporting = guard.is_enabled(),
        "Configuration loaded"
    );
    if !guard.is_enabled() {
        warn!("No access token configured - events are logged but not reported");
    }

    let emitted = tokio::select! {
        result = emit_events(args) => result?,
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, flushing reporter...");
            0
        }
    };

    guard.close().await.context("Failed to flush reporter")?;
    info!(events = emitted, "Reporter closed");

    print_delivery_summary(emitted, &guard);
    Ok(())
}

/// Apply CLI/env overrides and re-run validation
fn apply_overrides(config: &mut ReporterConfig, args: &RunArgs) -> Result<()> {
    if let Some(ref token) = args.token {
        config.reporter.token = token.clone();
    }
    if let Some(ref environment) = args.environment {
        config.reporter.environment = environment.clone();
    }
    if let Some(capacity) = args.queue_capacity {
        config.sink.queue_capacity = capacity;
    }

    config_loader::ConfigLoader::validate(config).context("Invalid configuration override")?;
    Ok(())
}

/// Emit one event per message, returning how many were emitted
async fn emit_events(args: &RunArgs) -> Result<u64> {
    if let Some(ref message) = args.message {
        for seq in 0..args.count {
            emit(args.level, message, seq);
        }
        return Ok(args.count);
    }

    debug!("Reading events from stdin");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut seq = 0u64;
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        emit(args.level, line, seq);
        seq += 1;
    }
    Ok(seq)
}

fn emit(level: EventLevel, message: &str, seq: u64) {
    match level {
        EventLevel::Critical => error!(severity = "critical", seq, "{message}"),
        EventLevel::Error => error!(seq, "{message}"),
        EventLevel::Warning => warn!(seq, "{message}"),
        EventLevel::Info => info!(seq, "{message}"),
        EventLevel::Debug => debug!(seq, "{message}"),
    }
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &ReporterConfig) {
    let reporter = &config.reporter;
    println!("\n=== Configuration Summary ===\n");
    println!("Reporter:");
    println!("  Environment: {}", reporter.environment);
    println!(
        "  Reporting: {}",
        if reporter.is_enabled() { "enabled" } else { "disabled (no token)" }
    );
    println!("  Levels: {:?}", reporter.levels);
    if !reporter.ignored_errors.is_empty() {
        println!("  Ignored errors: {:?}", reporter.ignored_errors);
    }
    println!("  Capture panics: {}", reporter.capture_panics);
    println!("\nSink:");
    println!("  {} ({:?})", config.sink.name, config.sink.sink_type);
    println!("  Queue capacity: {}", config.sink.queue_capacity);
    println!();
}

fn print_delivery_summary(emitted: u64, guard: &ReportGuard) {
    println!("\nEvents emitted: {emitted}");
    if let Some(stats) = guard.stats() {
        println!(
            "Reported: {}, ignored: {}, dropped: {}",
            stats.reported(),
            stats.ignored(),
            stats.dropped()
        );
    }
    if let Some(transport) = guard.transport() {
        println!("{}", transport.metrics().snapshot());
    }
}
