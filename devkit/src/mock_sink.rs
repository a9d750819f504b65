/*!
Mock presence sink for development without a backend

Records every delivered report and replies from a script of outcomes, so
scheduler behaviour can be asserted without any network.
*/

use async_trait::async_trait;
use hnnp_receiver::transport::{presence_endpoint, StatusCode};
use hnnp_receiver::{DeliveryError, PresenceReport, PresenceSink};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Scripted reply for one delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOutcome {
    Accept,
    Reject(u16),
}

/// Mock sink that stands in for `PresenceTransport`
///
/// Clones share state, so a test can keep one handle while the scheduler
/// owns another.
#[derive(Clone)]
pub struct MockPresenceSink {
    endpoint: String,
    delivered: Arc<Mutex<Vec<PresenceReport>>>,
    script: Arc<Mutex<VecDeque<MockOutcome>>>,
    fallback: MockOutcome,
    latency: Option<Duration>,
    started: Arc<AtomicUsize>,
    completed: Arc<AtomicUsize>,
}

impl MockPresenceSink {
    /// Sink accepting everything
    pub fn new() -> Self {
        Self {
            endpoint: presence_endpoint("http://mock-backend"),
            delivered: Arc::new(Mutex::new(Vec::new())),
            script: Arc::new(Mutex::new(VecDeque::new())),
            fallback: MockOutcome::Accept,
            latency: None,
            started: Arc::new(AtomicUsize::new(0)),
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue outcomes consumed in order; the fallback applies afterwards
    pub fn with_script<I>(self, outcomes: I) -> Self
    where
        I: IntoIterator<Item = MockOutcome>,
    {
        self.script.lock().extend(outcomes);
        self
    }

    /// Reject the next `times` deliveries with `status`
    pub fn failing_first(self, times: usize, status: u16) -> Self {
        self.with_script(std::iter::repeat(MockOutcome::Reject(status)).take(times))
    }

    /// Outcome once the script is exhausted
    pub fn with_fallback(mut self, outcome: MockOutcome) -> Self {
        self.fallback = outcome;
        self
    }

    /// Simulate a slow backend; uses tokio time so paused clocks apply
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Deliveries that have started, including in-flight ones
    pub fn attempts(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Deliveries that have returned
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Every report received, in order
    pub fn delivered_reports(&self) -> Vec<PresenceReport> {
        self.delivered.lock().clone()
    }

    /// Reports as they would appear on the wire
    pub fn delivered_json(&self) -> Vec<Value> {
        self.delivered
            .lock()
            .iter()
            .map(|report| serde_json::to_value(report).unwrap_or(Value::Null))
            .collect()
    }

    pub fn last_report(&self) -> Option<PresenceReport> {
        self.delivered.lock().last().cloned()
    }

    pub fn clear(&self) {
        self.delivered.lock().clear();
        self.script.lock().clear();
        self.started.store(0, Ordering::SeqCst);
        self.completed.store(0, Ordering::SeqCst);
    }

    fn next_outcome(&self) -> MockOutcome {
        self.script.lock().pop_front().unwrap_or(self.fallback)
    }
}

impl Default for MockPresenceSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PresenceSink for MockPresenceSink {
    async fn deliver(&self, report: &PresenceReport) -> Result<(), DeliveryError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.delivered.lock().push(report.clone());
        let outcome = self.next_outcome();

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        self.completed.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(time_slot = report.time_slot, ?outcome, "[MOCK] presence delivered");

        match outcome {
            MockOutcome::Accept => Ok(()),
            MockOutcome::Reject(code) => Err(DeliveryError::Status {
                url: self.endpoint.clone(),
                status: StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            }),
        }
    }
}
