/*!
Test harness for the receiver daemon

Wires together everything a scheduler test needs:
- Config fixtures and env-file fixtures in a temp directory
- A mock presence sink shared with the scheduler
- A shutdown handle to stop the loop from the test
*/

use crate::contract_helpers::PresenceContract;
use crate::mock_sink::MockPresenceSink;
use anyhow::Result;
use chrono::{TimeZone, Utc};
use hnnp_receiver::{
    ConfigSources, PlaceholderCredentials, PresenceReport, ReceiverConfig, RunSummary, Scheduler,
    SchedulerSettings, ShutdownSignal,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const FIXTURE_ORG_ID: &str = "org-test";
pub const FIXTURE_RECEIVER_ID: &str = "receiver-test";
pub const FIXTURE_SECRET: &str = "receiver-secret";
pub const FIXTURE_BACKEND_URL: &str = "http://mock-backend/";

/// Install a test-friendly tracing subscriber once per process
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("hnnp_receiver=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Environment map carrying every required setting
pub fn fixture_env() -> HashMap<String, String> {
    [
        ("HNNP_ORG_ID", FIXTURE_ORG_ID),
        ("HNNP_RECEIVER_ID", FIXTURE_RECEIVER_ID),
        ("HNNP_RECEIVER_SECRET", FIXTURE_SECRET),
        ("HNNP_BACKEND_URL", FIXTURE_BACKEND_URL),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Harness around a scheduler driven by a [`MockPresenceSink`]
pub struct TestHarness {
    pub sink: MockPresenceSink,
    pub shutdown: ShutdownSignal,
    pub config: Arc<ReceiverConfig>,
    pub settings: SchedulerSettings,
}

impl TestHarness {
    /// Harness with fixture config, accepting sink and a 10s tick
    pub fn new() -> Self {
        init_tracing();

        Self {
            sink: MockPresenceSink::new(),
            shutdown: ShutdownSignal::new(),
            config: Arc::new(Self::fixture_config()),
            settings: SchedulerSettings::default(),
        }
    }

    pub fn with_sink(mut self, sink: MockPresenceSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.settings.max_iterations = Some(max_iterations);
        self
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.settings.tick_interval = tick_interval;
        self
    }

    /// Validated config built from [`fixture_env`]
    pub fn fixture_config() -> ReceiverConfig {
        ReceiverConfig::resolve(&ConfigSources::new(fixture_env(), HashMap::new()))
            .expect("fixture env carries every required setting")
    }

    /// Placeholder-credential report for an epoch timestamp
    pub fn sample_report(timestamp: i64) -> PresenceReport {
        let now = Utc
            .timestamp_opt(timestamp, 0)
            .single()
            .expect("valid fixture timestamp");
        PresenceReport::new(&Self::fixture_config(), now, &PlaceholderCredentials)
    }

    /// Scheduler sharing this harness's sink and shutdown handle
    pub fn scheduler(&self) -> Scheduler<MockPresenceSink> {
        Scheduler::new(self.config.clone(), self.sink.clone(), self.shutdown.clone())
            .with_settings(self.settings.clone())
    }

    /// Run the scheduler to completion on the current task
    pub async fn run(&self) -> RunSummary {
        self.scheduler().run().await
    }

    /// Run the scheduler and trigger shutdown after `after` of tokio time
    pub async fn run_with_shutdown_after(&self, after: Duration) -> RunSummary {
        let scheduler = self.scheduler();
        let shutdown = self.shutdown.clone();
        let trigger = async move {
            tokio::time::sleep(after).await;
            shutdown.trigger();
        };
        let (summary, ()) = tokio::join!(scheduler.run(), trigger);
        summary
    }

    /// Every delivered payload must satisfy the strict presence contract
    pub fn assert_payloads_conform(&self) -> Result<()> {
        let contract = PresenceContract::strict();
        for payload in self.sink.delivered_json() {
            contract.check(&payload)?;
        }
        Ok(())
    }

    /// Write `contents` to an env file in a fresh temp directory
    pub fn env_file(contents: &str) -> Result<(tempfile::TempDir, std::path::PathBuf)> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("receiver.env");
        std::fs::write(&path, contents)?;
        Ok((dir, path))
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
