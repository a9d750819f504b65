//! Presence reporting loop
//!
//! Drives one delivery per tick until either the shutdown signal is seen at
//! a tick boundary or the iteration cap is reached. Delivery failures are
//! logged and the loop moves on; the next tick is the only retry.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::{ReceiverConfig, DEFAULT_TICK_INTERVAL};
use crate::credentials::{CredentialSupplier, PlaceholderCredentials};
use crate::health::HealthTracker;
use crate::report::PresenceReport;
use crate::shutdown::ShutdownSignal;
use crate::transport::{DeliveryError, PresenceSink};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub tick_interval: Duration,
    /// `None` (or `Some(0)`) runs until shutdown
    pub max_iterations: Option<u64>,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            max_iterations: None,
        }
    }
}

impl From<&ReceiverConfig> for SchedulerSettings {
    fn from(config: &ReceiverConfig) -> Self {
        Self {
            tick_interval: config.tick_interval,
            max_iterations: config.max_iterations,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    MaxIterations,
}

/// Outcome of a full scheduler run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub iterations: u64,
    pub delivered: u64,
    pub failed: u64,
    pub stop_reason: StopReason,
}

pub struct Scheduler<S> {
    config: Arc<ReceiverConfig>,
    sink: S,
    credentials: Box<dyn CredentialSupplier>,
    settings: SchedulerSettings,
    shutdown: ShutdownSignal,
    health: HealthTracker,
}

impl<S: PresenceSink> Scheduler<S> {
    /// Scheduler with placeholder credentials and settings taken from `config`
    pub fn new(config: Arc<ReceiverConfig>, sink: S, shutdown: ShutdownSignal) -> Self {
        let settings = SchedulerSettings::from(config.as_ref());
        Self {
            config,
            sink,
            credentials: Box::new(PlaceholderCredentials),
            settings,
            shutdown,
            health: HealthTracker::new(),
        }
    }

    pub fn with_credentials(mut self, supplier: impl CredentialSupplier + 'static) -> Self {
        self.credentials = Box::new(supplier);
        self
    }

    pub fn with_settings(mut self, settings: SchedulerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_health(mut self, health: HealthTracker) -> Self {
        self.health = health;
        self
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    pub fn health(&self) -> HealthTracker {
        self.health.clone()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Run until shutdown or the iteration cap
    ///
    /// The first tick fires one interval after start. A shutdown arriving
    /// during a delivery is honoured once that delivery returns.
    pub async fn run(&self) -> RunSummary {
        let period = self.settings.tick_interval;
        let max_iterations = self.settings.max_iterations.filter(|max| *max > 0);

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            org_id = %self.config.org_id,
            receiver_id = %self.config.receiver_id,
            interval_secs = period.as_secs_f64(),
            max_iterations = ?max_iterations,
            "presence scheduler started"
        );

        let mut iterations = 0_u64;
        let mut delivered = 0_u64;
        let mut failed = 0_u64;

        let stop_reason = loop {
            if let Some(max) = max_iterations {
                if iterations >= max {
                    info!(max_iterations = max, "reached max iterations; stopping");
                    break StopReason::MaxIterations;
                }
            }

            tokio::select! {
                biased;

                _ = self.shutdown.wait() => {
                    info!("shutdown signal received; stopping");
                    break StopReason::Shutdown;
                }

                _ = ticker.tick() => {
                    iterations += 1;
                    match self.report_at(Utc::now()).await {
                        Ok(()) => delivered += 1,
                        Err(_) => failed += 1,
                    }
                }
            }
        };

        let summary = RunSummary {
            iterations,
            delivered,
            failed,
            stop_reason,
        };
        info!(
            iterations = summary.iterations,
            delivered = summary.delivered,
            failed = summary.failed,
            stop_reason = ?summary.stop_reason,
            "presence scheduler stopped"
        );
        summary
    }

    /// Build the report for `now` and make one delivery attempt
    ///
    /// Failures are logged and recorded in the health tracker before being
    /// returned.
    pub async fn report_at(&self, now: DateTime<Utc>) -> Result<(), DeliveryError> {
        let report = PresenceReport::new(&self.config, now, self.credentials.as_ref());

        debug!(
            time_slot = report.time_slot,
            org_id = %report.org_id,
            receiver_id = %report.receiver_id,
            "sending presence"
        );
        self.health.record_attempt(now);

        match self.sink.deliver(&report).await {
            Ok(()) => {
                debug!(time_slot = report.time_slot, "presence accepted");
                self.health.record_success(Utc::now());
                Ok(())
            }
            Err(e) => {
                match e.status() {
                    Some(status) => warn!(
                        status = status.as_u16(),
                        time_slot = report.time_slot,
                        error = %e,
                        "presence rejected by backend"
                    ),
                    None => warn!(
                        time_slot = report.time_slot,
                        error = %e,
                        "error sending presence"
                    ),
                }
                self.health.record_failure(&e);
                Err(e)
            }
        }
    }
}
