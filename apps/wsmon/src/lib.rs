pub mod cli;
pub mod config;
pub mod error;
pub mod monitoring;
pub mod pool;
pub mod sink;
pub mod validation;

use std::future::Future;
use std::sync::Arc;

use tracing::{error, info};

use crate::config::MonitorSettings;
use crate::error::AppError;
use crate::monitoring::{MonitorReport, MonitoringExecutor, MonitoringScheduler};
use crate::sink::open_sink;

/// Monitor every configured site over HTTP until `shutdown` resolves.
pub async fn run<F>(settings: MonitorSettings, shutdown: F) -> Result<Vec<MonitorReport>, AppError>
where
    F: Future<Output = ()>,
{
    let executor = MonitoringExecutor::http(settings.request_timeout)?;
    run_with_executor(settings, Arc::new(executor), shutdown).await
}

/// Same as [`run`] with a caller-supplied executor.
///
/// The sink is opened before any monitor starts; failing to open it is fatal.
/// Once `shutdown` resolves every monitor finishes its in-flight attempt,
/// records it, and the sink is closed.
pub async fn run_with_executor<F>(
    settings: MonitorSettings,
    executor: Arc<MonitoringExecutor>,
    shutdown: F,
) -> Result<Vec<MonitorReport>, AppError>
where
    F: Future<Output = ()>,
{
    let sink = open_sink(&settings.storage).await?;

    info!(
        sites = settings.sites.len(),
        max_retry = settings.retry_policy.max_retry,
        retry_delay = ?settings.retry_policy.retry_delay,
        target_name = sink.target_name(),
        "starting wsmon"
    );
    for site in &settings.sites {
        info!(%site, "monitoring site");
    }

    let scheduler = MonitoringScheduler::new(executor, sink.clone(), settings.retry_policy);
    let reports = scheduler.run_until(settings.sites, shutdown).await;

    if let Err(e) = sink.close().await {
        error!(error = %e, target_name = sink.target_name(), "failed to close result sink");
    }

    for report in &reports {
        info!(
            url = %report.url,
            cycles = report.cycles,
            successes = report.successes,
            failures = report.failures,
            attempts = report.attempts,
            sink_failures = report.sink_failures,
            "site summary"
        );
    }
    info!("wsmon stopped");

    Ok(reports)
}
