//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{ReporterConfig, SinkType};

use crate::cli::ValidateArgs;
use crate::commands::load_config;

/// Capacity below which bursts of errors are likely to be dropped
const LOW_CAPACITY: usize = 10;

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
    version: String,
    environment: String,
    reporting_enabled: bool,
    levels: Vec<String>,
    sink: String,
    sink_type: String,
    queue_capacity: usize,
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

    match load_config(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
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
                    version: format!("{:?}", config.version),
                    environment: config.reporter.environment.clone(),
                    reporting_enabled: config.reporter.is_enabled(),
                    levels: config
                        .reporter
                        .levels
                        .iter()
                        .map(|l| l.to_string())
                        .collect(),
                    sink: config.sink.name.clone(),
                    sink_type: format!("{:?}", config.sink.sink_type),
                    queue_capacity: config.sink.queue_capacity,
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
fn collect_warnings(config: &ReporterConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if !config.reporter.is_enabled() {
        warnings.push("reporter.token is empty - reporting is disabled".to_string());
    }

    if config.sink.sink_type == SinkType::Log {
        warnings.push(format!(
            "Sink '{}' only logs records - nothing reaches a collector",
            config.sink.name
        ));
    }

    if config.sink.queue_capacity < LOW_CAPACITY {
        warnings.push(format!(
            "sink.queue_capacity is {} - bursts above that are dropped",
            config.sink.queue_capacity
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Environment: {}", summary.environment);
            println!("  Reporting: {}", summary.reporting_enabled);
            println!("  Levels: {}", summary.levels.join(", "));
            println!("  Sink: {} ({})", summary.sink, summary.sink_type);
            println!("  Queue capacity: {}", summary.queue_capacity);
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
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_warnings_for_minimal_config() {
        let file = write_config(
            r#"
[reporter]
environment = "dev"

[sink]
name = "console"
sink_type = "log"
queue_capacity = 4
"#,
        );
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        };

        let result = validate_config(&args);
        assert!(result.valid);
        assert_eq!(result.warnings.map(|w| w.len()), Some(3));
    }

    #[test]
    fn test_missing_file_is_invalid() {
        let args = ValidateArgs {
            config: "/nonexistent/beacon.toml".into(),
            json: false,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("not found"));
    }
}
