pub mod checker;
/// Monitoring engine module - probes sites and schedules their checks
///
/// This module is responsible for:
/// - Executing single HTTP checks and classifying them
/// - Running the per-site check/retry loop
/// - Scheduling one loop per site and draining them on shutdown
pub mod executor;
pub mod monitor;
pub mod scheduler;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use checker::{Checker, HttpChecker, HttpResponse, TransportError};
pub use executor::MonitoringExecutor;
pub use monitor::{MonitorReport, RetryPolicy, SiteMonitor};
pub use scheduler::{MonitoringScheduler, RunningMonitors};
pub use types::{CheckOutcome, ResultRecord, SiteSpec};
