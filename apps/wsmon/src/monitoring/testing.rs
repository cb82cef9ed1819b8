//! Scripted stand-ins for the network and the sink, shared by unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::Instant;

use super::checker::{Checker, HttpResponse, TransportError};
use super::types::ResultRecord;
use crate::error::SinkError;
use crate::sink::ResultSink;

pub(crate) type Reply = Result<HttpResponse, TransportError>;

/// Replays a fixed script of replies, then repeats `fallback` forever.
pub(crate) struct ScriptedChecker {
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    latency: Duration,
    calls: Mutex<Vec<Instant>>,
}

impl ScriptedChecker {
    pub fn always(reply: Reply) -> Self {
        Self::sequence(Vec::new(), reply)
    }

    pub fn sequence(script: Vec<Reply>, fallback: Reply) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Start instants of every fetch so far
    pub fn calls(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Checker for ScriptedChecker {
    async fn fetch(&self, _url: &str) -> Result<HttpResponse, TransportError> {
        self.calls.lock().unwrap().push(Instant::now());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

/// Keeps records in memory; can be switched to reject writes.
#[derive(Default)]
pub(crate) struct MemorySink {
    records: Mutex<Vec<ResultRecord>>,
    failing: AtomicBool,
}

impl MemorySink {
    pub fn records(&self) -> Vec<ResultRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl ResultSink for MemorySink {
    fn target_name(&self) -> &str {
        "memory"
    }

    async fn record(&self, record: &ResultRecord) -> Result<(), SinkError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SinkError::Pool("sink unavailable".to_string()));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}
