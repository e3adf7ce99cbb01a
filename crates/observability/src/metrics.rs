//! 投递指标收集模块
//!
//! 记录缓冲传输层与上报 hook 的运行指标。

use metrics::{counter, gauge, histogram};

/// 丢弃原因：队列已满
pub const DROP_BUFFER_FULL: &str = "buffer_full";
/// 丢弃原因：传输层已关闭
pub const DROP_CLOSED: &str = "closed";

/// 记录入队成功
pub fn record_record_enqueued(sink_name: &str) {
    counter!(
        "beacon_records_enqueued_total",
        "sink" => sink_name.to_string()
    )
    .increment(1);
}

/// 记录入队失败 (背压或已关闭)
///
/// # Example
///
/// ```ignore
/// use observability::metrics::{record_record_dropped, DROP_BUFFER_FULL};
///
/// if transport.send(record).is_err() {
///     record_record_dropped("collector", DROP_BUFFER_FULL);
/// }
/// ```
pub fn record_record_dropped(sink_name: &str, reason: &'static str) {
    counter!(
        "beacon_records_dropped_total",
        "sink" => sink_name.to_string(),
        "reason" => reason
    )
    .increment(1);
}

/// 记录 sink 投递结果
pub fn record_record_delivered(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "beacon_records_delivered_total",
        "sink" => sink_name.to_string(),
        "status" => status
    )
    .increment(1);
}

/// 记录单条投递耗时
pub fn record_send_latency_ms(sink_name: &str, latency_ms: f64) {
    histogram!(
        "beacon_sink_send_latency_ms",
        "sink" => sink_name.to_string()
    )
    .record(latency_ms);
}

/// 记录队列深度
pub fn record_queue_depth(sink_name: &str, depth: usize) {
    gauge!(
        "beacon_queue_depth",
        "sink" => sink_name.to_string()
    )
    .set(depth as f64);
}

/// 记录 hook 产生的上报
pub fn record_event_reported(severity: &str) {
    counter!(
        "beacon_events_reported_total",
        "severity" => severity.to_string()
    )
    .increment(1);
}

/// 记录被忽略策略过滤的事件
pub fn record_event_ignored() {
    counter!("beacon_events_ignored_total").increment(1);
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();

        for value in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(value);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_empty_summary_display() {
        let summary = StatsSummary::from(&RunningStats::default());
        assert_eq!(summary.to_string(), "N/A");
    }

    #[test]
    fn test_summary_display() {
        let mut stats = RunningStats::default();
        stats.push(2.0);
        stats.push(4.0);

        let output = StatsSummary::from(&stats).to_string();
        assert!(output.contains("mean=3.000"));
        assert!(output.contains("(n=2)"));
    }

    #[test]
    fn test_recorders_without_installed_recorder() {
        // The metrics facade is a no-op until a recorder is installed.
        record_record_enqueued("log");
        record_record_dropped("log", DROP_BUFFER_FULL);
        record_record_delivered("log", false);
        record_send_latency_ms("log", 1.5);
        record_queue_depth("log", 3);
        record_event_reported("error");
        record_event_ignored();
    }
}
