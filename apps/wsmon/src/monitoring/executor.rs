use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use regex::Regex;
use tokio::time::Instant;

use super::checker::{Checker, HttpChecker, HttpResponse};
use super::types::{CheckOutcome, SiteSpec};

/// Monitoring executor - runs a single probe attempt and classifies it
pub struct MonitoringExecutor {
    checker: Arc<dyn Checker>,
}

impl MonitoringExecutor {
    pub fn new(checker: Arc<dyn Checker>) -> Self {
        Self { checker }
    }

    /// Executor over a real HTTP client with the given request timeout
    pub fn http(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self::new(Arc::new(HttpChecker::new(timeout)?)))
    }

    /// Probe `site` once.
    ///
    /// Never fails: transport errors, bad status codes, and pattern misses
    /// all come back as an unsuccessful outcome.
    pub async fn execute_check(&self, site: &SiteSpec) -> CheckOutcome {
        let outcome = CheckOutcome::new(site.url(), Utc::now());

        let start = Instant::now();
        let result = self.checker.fetch(site.url()).await;
        let outcome = outcome.with_latency(start.elapsed());

        match result {
            Ok(response) => evaluate_response(outcome, &response, site.pattern()),
            Err(e) => outcome.failure(e.to_string()),
        }
    }
}

/// Classify a received response.
///
/// Success needs a 2xx status and, when `pattern` is set, a match somewhere
/// in the body. An unreadable body never matches.
pub fn evaluate_response(
    outcome: CheckOutcome,
    response: &HttpResponse,
    pattern: Option<&Regex>,
) -> CheckOutcome {
    let mut outcome = outcome.with_status(response.status_code);

    let pattern_failure = match (pattern, response.body.as_deref()) {
        (None, _) => None,
        (Some(pattern), Some(body)) if pattern.is_match(body) => {
            outcome = outcome.with_pattern_matched(true);
            None
        }
        (Some(pattern), Some(_)) => {
            outcome = outcome.with_pattern_matched(false);
            Some(format!("pattern '{}' not found in response body", pattern.as_str()))
        }
        (Some(_), None) => {
            outcome = outcome.with_pattern_matched(false);
            Some("response body could not be decoded".to_string())
        }
    };

    if !response.is_success() {
        return outcome.failure(format!("HTTP status {}", response.status_code));
    }

    match pattern_failure {
        Some(detail) => outcome.failure(detail),
        None => outcome.success(),
    }
}
