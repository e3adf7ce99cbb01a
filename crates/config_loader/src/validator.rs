//! 配置校验模块
//!
//! 校验规则：
//! - environment 非空
//! - 触发级别非空且不重复
//! - ignored_errors 不含空字符串
//! - 1 <= queue_capacity <= MAX_QUEUE_CAPACITY
//! - sink 必填字段齐全 (file 需要 path，network 需要合法 addr)

use std::collections::HashSet;
use std::net::SocketAddr;

use contracts::{ContractError, ReporterConfig, SinkConfig, SinkType};

/// 队列容量上限
pub const MAX_QUEUE_CAPACITY: usize = 1 << 20;

/// 校验 ReporterConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &ReporterConfig) -> Result<(), ContractError> {
    validate_environment(config)?;
    validate_levels(config)?;
    validate_ignored_errors(config)?;
    validate_sink(&config.sink)?;
    Ok(())
}

fn validate_environment(config: &ReporterConfig) -> Result<(), ContractError> {
    if config.reporter.environment.trim().is_empty() {
        return Err(ContractError::config_validation(
            "reporter.environment",
            "environment cannot be empty",
        ));
    }
    Ok(())
}

/// 校验触发级别
fn validate_levels(config: &ReporterConfig) -> Result<(), ContractError> {
    let levels = &config.reporter.levels;
    if levels.is_empty() {
        return Err(ContractError::config_validation(
            "reporter.levels",
            "at least one trigger level is required",
        ));
    }

    let mut seen = HashSet::new();
    for level in levels {
        if !seen.insert(level) {
            return Err(ContractError::config_validation(
                format!("reporter.levels[{level}]"),
                "duplicate level",
            ));
        }
    }
    Ok(())
}

fn validate_ignored_errors(config: &ReporterConfig) -> Result<(), ContractError> {
    for (idx, message) in config.reporter.ignored_errors.iter().enumerate() {
        if message.is_empty() {
            return Err(ContractError::config_validation(
                format!("reporter.ignored_errors[{idx}]"),
                "ignored error message cannot be empty",
            ));
        }
    }
    Ok(())
}

/// 校验 sink 配置
fn validate_sink(sink: &SinkConfig) -> Result<(), ContractError> {
    if sink.name.is_empty() {
        return Err(ContractError::config_validation(
            "sink.name",
            "sink name cannot be empty",
        ));
    }

    if sink.queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "sink.queue_capacity",
            "queue_capacity must be >= 1",
        ));
    }

    if sink.queue_capacity > MAX_QUEUE_CAPACITY {
        return Err(ContractError::config_validation(
            "sink.queue_capacity",
            format!("queue_capacity must be <= {MAX_QUEUE_CAPACITY}"),
        ));
    }

    match sink.sink_type {
        SinkType::Log => Ok(()),
        SinkType::File => {
            if sink.params.get("path").is_none_or(|p| p.is_empty()) {
                return Err(ContractError::config_validation(
                    "sink.params.path",
                    "file sink requires a 'path' parameter",
                ));
            }
            Ok(())
        }
        SinkType::Network => validate_network_params(sink),
    }
}

fn validate_network_params(sink: &SinkConfig) -> Result<(), ContractError> {
    let addr = sink.params.get("addr").ok_or_else(|| {
        ContractError::config_validation(
            "sink.params.addr",
            "network sink requires an 'addr' parameter",
        )
    })?;

    if addr.parse::<SocketAddr>().is_err() {
        return Err(ContractError::config_validation(
            "sink.params.addr",
            format!("invalid socket address '{addr}'"),
        ));
    }

    match sink.params.get("format").map(String::as_str) {
        None | Some("json") | Some("bincode") => Ok(()),
        Some(other) => Err(ContractError::config_validation(
            "sink.params.format",
            format!("unknown format '{other}', expected 'json' or 'bincode'"),
        )),
    }
}
