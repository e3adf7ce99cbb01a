//! ReporterConfig - Config Loader 输出
//!
//! 描述完整的上报配置：令牌、环境、触发级别、忽略规则、输出 sink。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::Severity;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的上报配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReporterConfig {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 上报策略
    pub reporter: ReportSettings,

    /// 输出路由配置
    pub sink: SinkConfig,
}

/// 上报策略：令牌、环境、触发级别等
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSettings {
    /// 访问令牌；为空时禁用上报
    #[serde(default)]
    pub token: String,

    /// 运行环境 (e.g., "production")
    pub environment: String,

    /// 触发上报的级别
    #[serde(default = "default_levels")]
    pub levels: Vec<Severity>,

    /// 忽略的错误 (按根因消息精确匹配)
    #[serde(default)]
    pub ignored_errors: Vec<String>,

    /// 是否安装 panic hook
    #[serde(default = "default_capture_panics")]
    pub capture_panics: bool,
}

fn default_levels() -> Vec<Severity> {
    Severity::DEFAULT_TRIGGERS.to_vec()
}

fn default_capture_panics() -> bool {
    true
}

impl ReportSettings {
    /// Whether a token is configured at all
    pub fn is_enabled(&self) -> bool {
        !self.token.trim().is_empty()
    }
}

/// Sink 输出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink 名称
    pub name: String,

    /// Sink 类型
    pub sink_type: SinkType,

    /// 队列容量
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// 日志输出
    Log,
    /// 文件输出 (JSON Lines)
    File,
    /// 网络输出 (UDP)
    Network,
}
