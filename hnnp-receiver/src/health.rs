//! Receiver health tracking and the optional `/health` endpoint
//!
//! The scheduler records every delivery attempt here. The HTTP endpoint
//! only reads the tracker, so it never influences the reporting loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::HealthEndpoint;
use crate::shutdown::ShutdownSignal;

/// Consecutive failures after which the receiver reports itself degraded
pub const DEGRADED_AFTER_FAILURES: u64 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverHealth {
    pub status: String,
    pub uptime_seconds: u64,
    pub total_attempts: u64,
    pub total_failures: u64,
    pub consecutive_failures: u64,
    pub last_attempt_at: Option<i64>,
    pub last_success_at: Option<i64>,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct LastDelivery {
    attempt_at: Option<DateTime<Utc>>,
    success_at: Option<DateTime<Utc>>,
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HealthTracker {
    start_time: Instant,
    attempts: Arc<AtomicU64>,
    failures: Arc<AtomicU64>,
    consecutive_failures: Arc<AtomicU64>,
    last: Arc<Mutex<LastDelivery>>,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            attempts: Arc::new(AtomicU64::new(0)),
            failures: Arc::new(AtomicU64::new(0)),
            consecutive_failures: Arc::new(AtomicU64::new(0)),
            last: Arc::new(Mutex::new(LastDelivery::default())),
        }
    }

    pub fn record_attempt(&self, at: DateTime<Utc>) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        self.last.lock().attempt_at = Some(at);
    }

    pub fn record_success(&self, at: DateTime<Utc>) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        let mut last = self.last.lock();
        last.success_at = Some(at);
        last.error = None;
    }

    pub fn record_failure(&self, error: &dyn std::error::Error) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
        self.last.lock().error = Some(error.to_string());
    }

    pub fn snapshot(&self) -> ReceiverHealth {
        let consecutive_failures = self.consecutive_failures.load(Ordering::Relaxed);
        let last = self.last.lock();

        ReceiverHealth {
            status: if consecutive_failures >= DEGRADED_AFTER_FAILURES {
                "degraded".to_string()
            } else {
                "ok".to_string()
            },
            uptime_seconds: self.start_time.elapsed().as_secs(),
            total_attempts: self.attempts.load(Ordering::Relaxed),
            total_failures: self.failures.load(Ordering::Relaxed),
            consecutive_failures,
            last_attempt_at: last.attempt_at.map(|t| t.timestamp()),
            last_success_at: last.success_at.map(|t| t.timestamp()),
            last_error: last.error.clone(),
        }
    }
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new()
    }
}

pub fn build_router(tracker: HealthTracker) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(tracker)
}

async fn health(State(tracker): State<HealthTracker>) -> Json<ReceiverHealth> {
    Json(tracker.snapshot())
}

/// Serve `GET /health` until shutdown is triggered
pub async fn serve(endpoint: &HealthEndpoint, tracker: HealthTracker, shutdown: ShutdownSignal) -> Result<()> {
    let listener = TcpListener::bind((endpoint.host.as_str(), endpoint.port))
        .await
        .with_context(|| format!("Failed to bind health endpoint on {endpoint}"))?;

    info!(addr = %endpoint, "health endpoint listening");

    axum::serve(listener, build_router(tracker))
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await
        .context("Health endpoint failed")?;

    info!("health endpoint stopped");
    Ok(())
}
