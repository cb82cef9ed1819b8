//! Per-site check loop.
//!
//! A `SiteMonitor` owns one site's run state and drives it through
//! `Idle → Checking → Evaluating → Idle`, looping through `Retrying` while
//! attempts fail and the retry budget allows. Exactly one `ResultRecord` is
//! written per cycle, when the cycle reaches its terminal outcome.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, error, info, warn};

use super::executor::MonitoringExecutor;
use super::types::{CheckOutcome, ResultRecord, SiteSpec};
use crate::sink::ResultSink;

/// Default number of retries after a failed attempt.
pub const DEFAULT_MAX_RETRY: u32 = 2;

/// How failing attempts are retried within one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first failed attempt
    pub max_retry: u32,
    /// Pause before each retry; zero retries immediately
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retry: DEFAULT_MAX_RETRY, retry_delay: Duration::ZERO }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPhase {
    Idle,
    Checking,
    Evaluating,
    Retrying,
}

/// Decision taken after an attempt completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Probe again; `attempt` is the 1-based retry number about to run.
    Retry { attempt: u32 },
    /// The cycle is over and its record is due.
    Terminal { retries_used: u32 },
}

/// Mutable state of one site, never shared outside its monitor task.
#[derive(Debug)]
pub struct MonitorRunState {
    retries_used: u32,
    next_fire_time: Instant,
    phase: MonitorPhase,
}

impl MonitorRunState {
    pub fn new(first_fire: Instant) -> Self {
        Self { retries_used: 0, next_fire_time: first_fire, phase: MonitorPhase::Idle }
    }

    pub fn retries_used(&self) -> u32 {
        self.retries_used
    }

    pub fn next_fire_time(&self) -> Instant {
        self.next_fire_time
    }

    pub fn phase(&self) -> MonitorPhase {
        self.phase
    }

    /// First attempt of a scheduled cycle.
    pub fn begin_check(&mut self) {
        self.phase = MonitorPhase::Checking;
    }

    /// A retry attempt is about to run.
    pub fn begin_retry(&mut self) {
        self.retries_used += 1;
        self.phase = MonitorPhase::Checking;
    }

    /// Decide what follows a completed attempt.
    pub fn evaluate(&mut self, succeeded: bool, max_retry: u32) -> Transition {
        self.phase = MonitorPhase::Evaluating;

        if !succeeded && self.retries_used < max_retry {
            self.phase = MonitorPhase::Retrying;
            Transition::Retry { attempt: self.retries_used + 1 }
        } else {
            Transition::Terminal { retries_used: self.retries_used }
        }
    }

    /// Close the cycle: reset the retry counter and schedule the next fire.
    pub fn finish_cycle(&mut self, now: Instant, check_interval: Duration) {
        self.retries_used = 0;
        self.phase = MonitorPhase::Idle;
        self.next_fire_time = now + check_interval;
    }
}

/// Counters gathered by a monitor over its lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorReport {
    pub url: String,
    /// Terminal outcomes reached
    pub cycles: u64,
    pub successes: u64,
    pub failures: u64,
    /// Probe attempts, retries included
    pub attempts: u64,
    /// Records the sink refused
    pub sink_failures: u64,
}

impl MonitorReport {
    fn new(url: &str) -> Self {
        Self { url: url.to_string(), ..Self::default() }
    }
}

/// Runs the check → evaluate → retry → record loop for one site.
pub struct SiteMonitor {
    site: Arc<SiteSpec>,
    executor: Arc<MonitoringExecutor>,
    sink: Arc<dyn ResultSink>,
    policy: RetryPolicy,
}

impl SiteMonitor {
    pub fn new(
        site: Arc<SiteSpec>,
        executor: Arc<MonitoringExecutor>,
        sink: Arc<dyn ResultSink>,
        policy: RetryPolicy,
    ) -> Self {
        Self { site, executor, sink, policy }
    }

    /// Loop until `shutdown` turns true (or its sender is dropped).
    ///
    /// The first cycle fires immediately. Shutdown is observed while idle,
    /// before every retry and during a retry delay; a probe or record write
    /// that has started always completes.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> MonitorReport {
        let mut state = MonitorRunState::new(Instant::now());
        let mut report = MonitorReport::new(self.site.url());

        info!(site = %self.site, "site monitor started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown_signalled(&mut shutdown) => break,
                _ = sleep_until(state.next_fire_time()) => {}
            }

            self.run_cycle(&mut state, &mut report, &mut shutdown).await;
        }

        info!(url = %self.site.url(), cycles = report.cycles, "site monitor stopped");
        report
    }

    /// One scheduled cycle, ending with exactly one record write.
    async fn run_cycle(
        &self,
        state: &mut MonitorRunState,
        report: &mut MonitorReport,
        shutdown: &mut watch::Receiver<bool>,
    ) {
        state.begin_check();
        let mut outcome = self.probe(report).await;

        let retries_used = loop {
            match state.evaluate(outcome.succeeded, self.policy.max_retry) {
                Transition::Terminal { retries_used } => break retries_used,
                Transition::Retry { attempt } => {
                    debug!(
                        url = %self.site.url(),
                        attempt,
                        max_retry = self.policy.max_retry,
                        error = outcome.error_detail.as_deref().unwrap_or_default(),
                        "check failed, retrying"
                    );

                    let interrupted = if self.policy.retry_delay.is_zero() {
                        stop_requested(shutdown)
                    } else {
                        tokio::select! {
                            biased;
                            _ = shutdown_signalled(shutdown) => true,
                            _ = sleep(self.policy.retry_delay) => false,
                        }
                    };
                    if interrupted {
                        info!(
                            url = %self.site.url(),
                            retries_used = state.retries_used(),
                            "shutdown before retry, recording last attempt"
                        );
                        break state.retries_used();
                    }

                    state.begin_retry();
                    outcome = self.probe(report).await;
                }
            }
        };

        self.record(&outcome, retries_used, report).await;
        state.finish_cycle(Instant::now(), self.site.check_interval());
    }

    async fn probe(&self, report: &mut MonitorReport) -> CheckOutcome {
        debug!(url = %self.site.url(), "check started");
        report.attempts += 1;
        self.executor.execute_check(&self.site).await
    }

    async fn record(&self, outcome: &CheckOutcome, retries_used: u32, report: &mut MonitorReport) {
        let record = ResultRecord::from_outcome(self.sink.target_name(), outcome, retries_used);

        report.cycles += 1;
        if record.succeeded {
            report.successes += 1;
            info!(
                url = %record.url,
                status_code = record.status_code,
                latency_ms = record.latency_ms,
                pattern_matched = record.pattern_matched,
                retries_used,
                "check succeeded"
            );
        } else {
            report.failures += 1;
            warn!(
                url = %record.url,
                status_code = record.status_code,
                latency_ms = record.latency_ms,
                pattern_matched = record.pattern_matched,
                retries_used,
                error = record.error_detail.as_deref().unwrap_or_default(),
                "check failed"
            );
        }

        if let Err(e) = self.sink.record(&record).await {
            report.sink_failures += 1;
            error!(
                url = %record.url,
                target = self.sink.target_name(),
                error = %e,
                "failed to record check result"
            );
        }
    }
}

/// Resolves once a stop is requested or the scheduler is gone.
async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Non-blocking form of [`shutdown_signalled`].
fn stop_requested(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow() || shutdown.has_changed().is_err()
}
