//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置 -> 上报 hook -> transport -> sink 全链路
//! - 多线程生产者与阻塞关闭

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::fs;
    use std::path::Path;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{Record, ReporterConfig};
    use tokio::net::UdpSocket;
    use tracing_subscriber::prelude::*;

    fn file_config(path: &Path, capacity: usize) -> ReporterConfig {
        let content = format!(
            r#"
[reporter]
token = "e2e-token"
environment = "staging"
levels = ["error", "critical", "warning"]
ignored_errors = ["context canceled"]
capture_panics = false

[sink]
name = "reports"
sink_type = "file"
queue_capacity = {capacity}
[sink.params]
path = "{}"
"#,
            path.display()
        );
        ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap()
    }

    fn read_records(path: &Path) -> Vec<Record> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    /// End-to-end test: config -> ReportLayer -> BufferedTransport -> FileSink
    ///
    /// 验证完整的数据流：
    /// 1. 配置加载并校验
    /// 2. tracing 事件按级别与忽略规则过滤
    /// 3. close 后所有记录已写入 JSONL
    #[tokio::test]
    async fn test_e2e_file_reporting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports.jsonl");
        let config = file_config(&path, 64);

        let (layer, guard) = report_hook::setup_reporting(&config).await.unwrap();
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "app", "not a trigger level");
            tracing::warn!(target: "app", "cache miss rate high");
            tracing::error!(target: "app", order_id = 42, "payment declined");
            tracing::error!(target: "app", error = "context canceled", "request aborted");
        });

        guard.close().await.unwrap();

        let records = read_records(&path);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("level"), Some("warning"));
        assert_eq!(records[1].get("message"), Some("payment declined"));
        assert_eq!(records[1].get("order_id"), Some("42"));
        assert_eq!(records[1].get("environment"), Some("staging"));

        let stats = guard.stats().unwrap();
        assert_eq!(stats.reported(), 2);
        assert_eq!(stats.ignored(), 1);

        // Closed guard rejects further records
        tracing::subscriber::with_default(
            tracing_subscriber::registry().with(report_hook::ReportLayer::new(
                guard.transport().unwrap().clone(),
                "staging",
            )),
            || tracing::error!(target: "app", "after close"),
        );
        assert_eq!(read_records(&path).len(), 2);
    }

    #[tokio::test]
    async fn test_e2e_network_reporting() {
        let collector = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = collector.local_addr().unwrap();

        let content = format!(
            r#"
[reporter]
token = "net-token"
environment = "production"
capture_panics = false

[sink]
name = "collector"
sink_type = "network"
[sink.params]
addr = "{addr}"
format = "json"
"#
        );
        let config = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap();

        let (layer, guard) = report_hook::setup_reporting(&config).await.unwrap();
        tracing::subscriber::with_default(tracing_subscriber::registry().with(layer), || {
            tracing::error!(target: "app", "database unreachable");
        });
        guard.close().await.unwrap();

        let mut buf = vec![0u8; 65536];
        let (len, _) = collector.recv_from(&mut buf).await.unwrap();
        let envelope: serde_json::Value = serde_json::from_slice(&buf[..len]).unwrap();
        assert_eq!(envelope["access_token"], "net-token");
        assert_eq!(envelope["record"]["message"], "database unreachable");
        assert_eq!(envelope["record"]["level"], "error");
    }

    /// 多个 OS 线程并发发送，再从阻塞线程关闭
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_threaded_producers_and_blocking_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("threads.jsonl");
        let config = file_config(&path, 4);
        let transport = transport::create_transport(&config.sink, &config.reporter.token)
            .await
            .unwrap();

        let producers: Vec<_> = (0..4)
            .map(|producer| {
                let transport = transport.clone();
                std::thread::spawn(move || {
                    for seq in 0..50 {
                        let record = Record::new()
                            .with("producer", producer.to_string())
                            .with("seq", seq.to_string());
                        while let Err(e) = transport.send(record.clone()) {
                            assert!(e.is_buffer_full());
                            std::thread::yield_now();
                        }
                    }
                    transport.blocking_wait();
                })
            })
            .collect();

        let closer = {
            let transport = transport.clone();
            tokio::task::spawn_blocking(move || {
                for producer in producers {
                    producer.join().unwrap();
                }
                transport.blocking_close()
            })
        };
        closer.await.unwrap().unwrap();

        let records = read_records(&path);
        assert_eq!(records.len(), 200);
        for producer in 0..4 {
            let seqs: Vec<u32> = records
                .iter()
                .filter(|r| r.get("producer") == Some(producer.to_string().as_str()))
                .map(|r| r.get("seq").unwrap().parse().unwrap())
                .collect();
            assert_eq!(seqs, (0..50).collect::<Vec<_>>());
        }

        let metrics = transport.metrics().snapshot();
        assert_eq!(metrics.delivered_count, 200);
        assert_eq!(metrics.enqueued_count, 200);
    }

    #[tokio::test]
    async fn test_e2e_disabled_without_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("none.jsonl");
        let mut config = file_config(&path, 8);
        config.reporter.token.clear();

        let (layer, guard) = report_hook::setup_reporting(&config).await.unwrap();
        assert!(layer.is_none());
        guard.close().await.unwrap();
        assert!(!path.exists());
    }
}
