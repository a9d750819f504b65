//! HNNP Receiver daemon
//!
//! Loads the receiver configuration, then reports presence to the cloud
//! backend on a fixed cadence until SIGINT/SIGTERM or the iteration cap.
//! A configuration error exits non-zero before the loop starts.

use std::sync::Arc;

use anyhow::{Context, Result};
use hnnp_receiver::{health, shutdown, PresenceTransport, ReceiverConfig, Scheduler, ShutdownSignal};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("hnnp_receiver=info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "HNNP receiver starting (placeholder credentials, no BLE scanning)"
    );

    let config = Arc::new(
        ReceiverConfig::load().context("Failed to load receiver configuration")?,
    );

    let transport = PresenceTransport::new(&config.backend_url, config.request_timeout)
        .context("Failed to build HTTP client")?;
    info!(endpoint = %transport.endpoint(), "presence transport ready");

    let shutdown_signal = ShutdownSignal::new();
    let scheduler = Scheduler::new(config.clone(), transport, shutdown_signal.clone());

    // Wire SIGINT/SIGTERM to a graceful stop at the next tick boundary.
    let signal_handle = shutdown_signal.clone();
    tokio::spawn(async move {
        match shutdown::termination_requested().await {
            Ok(signal) => {
                info!(signal, "termination requested");
                signal_handle.trigger();
            }
            Err(e) => error!(error = %e, "failed to listen for termination signals"),
        }
    });

    let health_task = config.health.clone().map(|endpoint| {
        let tracker = scheduler.health();
        let shutdown = shutdown_signal.clone();
        tokio::spawn(async move {
            if let Err(e) = health::serve(&endpoint, tracker, shutdown).await {
                warn!(error = %e, "health endpoint unavailable");
            }
        })
    });

    scheduler.run().await;

    // The iteration cap ends the loop without a signal; stop the health endpoint too.
    if !shutdown_signal.is_triggered() {
        shutdown_signal.trigger();
    }
    if let Some(task) = health_task {
        if let Err(e) = task.await {
            warn!(error = %e, "health endpoint task panicked");
        }
    }

    info!("HNNP receiver exiting");
    Ok(())
}
