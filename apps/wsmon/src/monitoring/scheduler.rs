use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::executor::MonitoringExecutor;
use super::monitor::{MonitorReport, RetryPolicy, SiteMonitor};
use super::types::SiteSpec;
use crate::sink::ResultSink;

/// Monitoring scheduler - runs one site monitor task per configured site
pub struct MonitoringScheduler {
    executor: Arc<MonitoringExecutor>,
    sink: Arc<dyn ResultSink>,
    policy: RetryPolicy,
}

impl MonitoringScheduler {
    pub fn new(
        executor: Arc<MonitoringExecutor>,
        sink: Arc<dyn ResultSink>,
        policy: RetryPolicy,
    ) -> Self {
        Self { executor, sink, policy }
    }

    /// Spawn a monitor for a single site
    pub fn schedule_monitor(
        &self,
        site: SiteSpec,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<MonitorReport> {
        let monitor =
            SiteMonitor::new(Arc::new(site), self.executor.clone(), self.sink.clone(), self.policy);
        tokio::spawn(monitor.run(shutdown))
    }

    /// Spawn one monitor per site, all sharing one shutdown signal
    pub fn schedule_monitors(&self, sites: Vec<SiteSpec>) -> RunningMonitors {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handles = sites
            .into_iter()
            .map(|site| self.schedule_monitor(site, shutdown_rx.clone()))
            .collect();

        RunningMonitors { shutdown_tx, handles }
    }

    /// Run all sites until `signal` resolves, then drain every monitor.
    pub async fn run_until<F>(&self, sites: Vec<SiteSpec>, signal: F) -> Vec<MonitorReport>
    where
        F: Future<Output = ()>,
    {
        let running = self.schedule_monitors(sites);
        info!(monitors = running.len(), "monitoring started");

        signal.await;
        info!("shutdown requested, waiting for site monitors to finish");

        running.shutdown().await
    }
}

/// Handles to a set of running site monitors.
pub struct RunningMonitors {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<MonitorReport>>,
}

impl RunningMonitors {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Signal every monitor to stop and wait until all have finished.
    pub async fn shutdown(self) -> Vec<MonitorReport> {
        self.shutdown_tx.send_replace(true);

        join_all(self.handles)
            .await
            .into_iter()
            .filter_map(|joined| match joined {
                Ok(report) => Some(report),
                Err(e) => {
                    error!(error = %e, "site monitor task failed");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::monitoring::checker::{HttpResponse, TransportError};
    use crate::monitoring::testing::{MemorySink, ScriptedChecker};

    fn site(url: &str, interval_secs: u64) -> SiteSpec {
        SiteSpec::new(url, Duration::from_secs(interval_secs), None).unwrap()
    }

    fn scheduler(checker: ScriptedChecker, sink: Arc<MemorySink>) -> MonitoringScheduler {
        MonitoringScheduler::new(
            Arc::new(MonitoringExecutor::new(Arc::new(checker))),
            sink,
            RetryPolicy::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn sites_run_on_independent_clocks() {
        let sink = Arc::new(MemorySink::default());
        let scheduler = scheduler(ScriptedChecker::always(Ok(HttpResponse::new(200, ""))), sink.clone());

        let running =
            scheduler.schedule_monitors(vec![site("https://fast.test", 5), site("https://slow.test", 300)]);
        assert_eq!(running.len(), 2);

        tokio::time::sleep(Duration::from_millis(20_500)).await;
        let reports = running.shutdown().await;

        let fast = sink.records().iter().filter(|r| r.url == "https://fast.test").count();
        let slow = sink.records().iter().filter(|r| r.url == "https://slow.test").count();
        assert_eq!(fast, 5);
        assert_eq!(slow, 1);
        assert_eq!(reports.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_on_one_site_do_not_delay_another() {
        let sink = Arc::new(MemorySink::default());
        let checker = ScriptedChecker::always(Err(TransportError::Timeout))
            .with_latency(Duration::from_secs(4));
        let failing = scheduler(checker, sink.clone());
        let healthy = scheduler(ScriptedChecker::always(Ok(HttpResponse::new(200, ""))), sink.clone());

        let slow = failing.schedule_monitors(vec![site("https://down.test", 60)]);
        let fast = healthy.schedule_monitors(vec![site("https://up.test", 5)]);

        // down.test spends 12s in its three attempts; up.test keeps its 5s cadence.
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        let up = sink.records().iter().filter(|r| r.url == "https://up.test").count();
        let down = sink.records().iter().filter(|r| r.url == "https://down.test").count();
        assert_eq!(up, 3);
        assert_eq!(down, 0);

        fast.shutdown().await;
        slow.shutdown().await;
        let down = sink.records().iter().filter(|r| r.url == "https://down.test").count();
        assert_eq!(down, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_until_drains_all_monitors() {
        let sink = Arc::new(MemorySink::default());
        let scheduler = scheduler(ScriptedChecker::always(Ok(HttpResponse::new(200, ""))), sink.clone());
        let sites = (0..8).map(|i| site(&format!("https://site{i}.test"), 5)).collect();

        let reports = scheduler.run_until(sites, tokio::time::sleep(Duration::from_secs(1))).await;

        assert_eq!(reports.len(), 8);
        assert!(reports.iter().all(|r| r.cycles == 1 && r.successes == 1));
        assert_eq!(sink.records().len(), 8);
    }

    #[tokio::test]
    async fn empty_site_list_shuts_down_immediately() {
        let sink = Arc::new(MemorySink::default());
        let scheduler = scheduler(ScriptedChecker::always(Ok(HttpResponse::new(200, ""))), sink);

        let running = scheduler.schedule_monitors(Vec::new());
        assert!(running.is_empty());
        assert!(running.shutdown().await.is_empty());
    }
}
