//! One-call wiring from `ReporterConfig`

use std::sync::Arc;

use tracing::{debug, info, instrument};

use contracts::ReporterConfig;
use transport::{create_transport, BufferedTransport, TransportError};

use crate::layer::{HookStats, ReportLayer};
use crate::panic::install_panic_hook;
use crate::policy::IgnorePolicy;

/// Keeps the reporting transport alive; `close` flushes it
///
/// A guard created with an empty token is a no-op.
#[derive(Clone, Default)]
pub struct ReportGuard {
    transport: Option<BufferedTransport>,
    stats: Option<Arc<HookStats>>,
}

impl ReportGuard {
    /// Whether reporting is active
    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    pub fn transport(&self) -> Option<&BufferedTransport> {
        self.transport.as_ref()
    }

    pub fn stats(&self) -> Option<Arc<HookStats>> {
        self.stats.clone()
    }

    /// Deliver everything reported so far, then close the sink
    pub async fn close(&self) -> Result<(), TransportError> {
        match &self.transport {
            Some(transport) => transport.close().await,
            None => Ok(()),
        }
    }

    /// Blocking variant of [`close`](Self::close) for use outside the runtime
    pub fn blocking_close(&self) -> Result<(), TransportError> {
        match &self.transport {
            Some(transport) => transport.blocking_close(),
            None => Ok(()),
        }
    }
}

/// Build the reporting layer from configuration
///
/// With an empty token nothing is spawned: the layer is `None` (a no-op when
/// added to a subscriber) and the guard does nothing. Otherwise the sink and
/// transport are started, and the panic hook is installed when
/// `capture_panics` is set.
#[instrument(name = "setup_reporting", skip(config), fields(environment = %config.reporter.environment))]
pub async fn setup_reporting(
    config: &ReporterConfig,
) -> Result<(Option<ReportLayer>, ReportGuard), TransportError> {
    let settings = &config.reporter;
    if !settings.is_enabled() {
        debug!("No access token configured, reporting disabled");
        return Ok((None, ReportGuard::default()));
    }

    let transport = create_transport(&config.sink, &settings.token).await?;

    let policy = IgnorePolicy::new().with_ignored_errors(settings.ignored_errors.iter().cloned());
    let layer = ReportLayer::new(transport.clone(), settings.environment.as_str())
        .with_levels(settings.levels.clone())
        .with_policy(policy);

    if settings.capture_panics {
        install_panic_hook(transport.clone(), settings.environment.as_str());
    }

    info!(
        sink = %config.sink.name,
        levels = ?settings.levels,
        capture_panics = settings.capture_panics,
        "Error reporting enabled"
    );

    let guard = ReportGuard {
        transport: Some(transport),
        stats: Some(layer.stats()),
    };
    Ok((Some(layer), guard))
}
