//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use contracts::ReporterConfig;

use crate::cli::InfoArgs;
use crate::commands::load_config;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    reporter: ReporterInfo,
    sink: SinkInfo,
}

#[derive(Serialize)]
struct ReporterInfo {
    environment: String,
    reporting_enabled: bool,
    levels: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    ignored_errors: Vec<String>,
    capture_panics: bool,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&config);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config);
    }

    Ok(())
}

fn build_config_info(config: &ReporterConfig) -> ConfigInfo {
    let reporter = &config.reporter;
    ConfigInfo {
        version: format!("{:?}", config.version),
        reporter: ReporterInfo {
            environment: reporter.environment.clone(),
            reporting_enabled: reporter.is_enabled(),
            levels: reporter.levels.iter().map(|l| l.to_string()).collect(),
            ignored_errors: reporter.ignored_errors.clone(),
            capture_panics: reporter.capture_panics,
        },
        sink: SinkInfo {
            name: config.sink.name.clone(),
            sink_type: format!("{:?}", config.sink.sink_type),
            queue_capacity: config.sink.queue_capacity,
            // 参数按键排序，输出稳定
            params: config
                .sink
                .params
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        },
    }
}

fn print_config_info(config: &ReporterConfig) {
    let reporter = &config.reporter;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  Beacon Reporter Configuration               ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📣 Reporter");
    println!("   ├─ Version: {:?}", config.version);
    println!("   ├─ Environment: {}", reporter.environment);
    println!(
        "   ├─ Token: {}",
        if reporter.is_enabled() { "set" } else { "(empty, reporting disabled)" }
    );
    println!(
        "   ├─ Levels: {}",
        reporter
            .levels
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    if !reporter.ignored_errors.is_empty() {
        println!("   ├─ Ignored errors: {:?}", reporter.ignored_errors);
    }
    println!("   └─ Capture panics: {}", reporter.capture_panics);

    let sink = &config.sink;
    println!("\n📤 Sink");
    println!("   ├─ Name: {} ({:?})", sink.name, sink.sink_type);
    if sink.params.is_empty() {
        println!("   └─ Queue capacity: {}", sink.queue_capacity);
    } else {
        println!("   ├─ Queue capacity: {}", sink.queue_capacity);
        let params: BTreeMap<_, _> = sink.params.iter().collect();
        for (i, (key, value)) in params.iter().enumerate() {
            let prefix = if i == params.len() - 1 { "└─" } else { "├─" };
            println!("   {} {}: {}", prefix, key, value);
        }
    }

    println!();
}
