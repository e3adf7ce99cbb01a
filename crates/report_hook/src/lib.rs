//! # Report Hook
//!
//! 将 `tracing` 事件转换为上报记录并交给 [`transport::BufferedTransport`]。
//!
//! - [`ReportLayer`]: `tracing_subscriber::Layer`，按级别与忽略策略过滤
//! - [`install_panic_hook`]: panic 时发送 critical 记录
//! - [`setup_reporting`]: 按配置一次性装配 transport + layer + panic hook
//!
//! ```ignore
//! use tracing_subscriber::prelude::*;
//!
//! let (layer, guard) = report_hook::setup_reporting(&config).await?;
//! tracing_subscriber::registry().with(layer).init();
//! tracing::error!(error = &err as &dyn std::error::Error, "request failed");
//! guard.close().await?;
//! ```

mod fields;
mod layer;
mod panic;
mod policy;
mod setup;

pub use layer::{HookStats, ReportLayer};
pub use panic::install_panic_hook;
pub use policy::IgnorePolicy;
pub use setup::{setup_reporting, ReportGuard};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};

    use contracts::{ContractError, Record, RecordSink};

    /// Sink that keeps every record it is handed
    #[derive(Clone, Default)]
    pub struct CollectSink {
        pub records: Arc<Mutex<Vec<Record>>>,
    }

    impl CollectSink {
        pub fn records(&self) -> Vec<Record> {
            self.records.lock().unwrap().clone()
        }
    }

    impl RecordSink for CollectSink {
        fn name(&self) -> &str {
            "collect"
        }

        async fn send(&mut self, record: &Record) -> Result<(), ContractError> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }
}
