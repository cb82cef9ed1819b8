use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A monitored site, validated and immutable once loaded.
#[derive(Debug, Clone)]
pub struct SiteSpec {
    url: String,
    check_interval: Duration,
    pattern: Option<Regex>,
}

impl SiteSpec {
    /// Create a site spec. The interval must be non-zero.
    pub fn new(
        url: impl Into<String>,
        check_interval: Duration,
        pattern: Option<Regex>,
    ) -> Result<Self, ConfigError> {
        let url = url.into();
        if check_interval.is_zero() {
            return Err(ConfigError::InvalidSite {
                url,
                reason: "check_interval must be greater than zero".to_string(),
            });
        }

        Ok(Self { url, check_interval, pattern })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    pub fn pattern(&self) -> Option<&Regex> {
        self.pattern.as_ref()
    }
}

impl fmt::Display for SiteSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "url={} check_interval={}", self.url, self.check_interval.as_secs())?;
        match &self.pattern {
            Some(pattern) => write!(f, " pattern='{}'", pattern.as_str()),
            None => write!(f, " pattern=None"),
        }
    }
}

/// Outcome of a single probe attempt
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    /// URL that was probed
    pub url: String,

    /// When the attempt started
    pub timestamp: DateTime<Utc>,

    /// Whether the attempt counts as a success
    pub succeeded: bool,

    /// HTTP status code, absent on transport failure
    pub status_code: Option<u16>,

    /// Time from request start until the body was read (or the failure)
    pub latency: Duration,

    /// Whether the configured pattern was found; absent when no pattern is set
    pub pattern_matched: Option<bool>,

    /// What went wrong, present only on failure
    pub error_detail: Option<String>,
}

impl CheckOutcome {
    /// Start an outcome for `url`, not yet classified.
    pub fn new(url: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            url: url.into(),
            timestamp,
            succeeded: false,
            status_code: None,
            latency: Duration::ZERO,
            pattern_matched: None,
            error_detail: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_pattern_matched(mut self, matched: bool) -> Self {
        self.pattern_matched = Some(matched);
        self
    }

    /// Mark the attempt as successful
    pub fn success(mut self) -> Self {
        self.succeeded = true;
        self.error_detail = None;
        self
    }

    /// Mark the attempt as failed with error
    pub fn failure(mut self, detail: impl Into<String>) -> Self {
        self.succeeded = false;
        self.error_detail = Some(detail.into());
        self
    }

    pub fn latency_ms(&self) -> u64 {
        u64::try_from(self.latency.as_millis()).unwrap_or(u64::MAX)
    }
}

/// One persisted row/line: the terminal outcome of a scheduled check cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Table name or file path the record was written to
    pub target_name: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
    pub succeeded: bool,
    pub status_code: Option<u16>,
    pub latency_ms: u64,
    pub pattern_matched: Option<bool>,
    pub error_detail: Option<String>,
    /// Retry attempts made before this outcome
    pub retries_used: u32,
}

impl ResultRecord {
    pub fn from_outcome(target_name: &str, outcome: &CheckOutcome, retries_used: u32) -> Self {
        Self {
            target_name: target_name.to_string(),
            url: outcome.url.clone(),
            timestamp: outcome.timestamp,
            succeeded: outcome.succeeded,
            status_code: outcome.status_code,
            latency_ms: outcome.latency_ms(),
            pattern_matched: outcome.pattern_matched,
            error_detail: outcome.error_detail.clone(),
            retries_used,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_spec_rejects_zero_interval() {
        let result = SiteSpec::new("http://testsite.io", Duration::ZERO, None);
        assert!(matches!(result, Err(ConfigError::InvalidSite { .. })));
    }

    #[test]
    fn site_spec_display() {
        let pattern = Regex::new(r"(.*) example").unwrap();
        let site =
            SiteSpec::new("http://testsite.io", Duration::from_secs(111), Some(pattern)).unwrap();
        assert_eq!(
            site.to_string(),
            "url=http://testsite.io check_interval=111 pattern='(.*) example'"
        );

        let site = SiteSpec::new("http://testsite.io", Duration::from_secs(5), None).unwrap();
        assert_eq!(site.to_string(), "url=http://testsite.io check_interval=5 pattern=None");
    }

    #[test]
    fn record_copies_outcome_fields() {
        let outcome = CheckOutcome::new("https://example.com", Utc::now())
            .with_status(503)
            .with_latency(Duration::from_millis(42))
            .failure("HTTP status 503");

        let record = ResultRecord::from_outcome("wsmon_results", &outcome, 2);
        assert_eq!(record.target_name, "wsmon_results");
        assert_eq!(record.url, "https://example.com");
        assert_eq!(record.timestamp, outcome.timestamp);
        assert!(!record.succeeded);
        assert_eq!(record.status_code, Some(503));
        assert_eq!(record.latency_ms, 42);
        assert_eq!(record.pattern_matched, None);
        assert_eq!(record.error_detail.as_deref(), Some("HTTP status 503"));
        assert_eq!(record.retries_used, 2);
    }

    #[test]
    fn success_clears_error_detail() {
        let outcome = CheckOutcome::new("https://example.com", Utc::now())
            .failure("transient")
            .success();
        assert!(outcome.succeeded);
        assert!(outcome.error_detail.is_none());
    }
}
