//! Cooperative shutdown coordination
//!
//! A [`ShutdownSignal`] is cloned into every long-running task. Triggering
//! any clone flips the shared flag; waiters observe it at their next await
//! point. Nothing is preempted.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    trigger: Arc<watch::Sender<bool>>,
    state: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (trigger, state) = watch::channel(false);
        Self {
            trigger: Arc::new(trigger),
            state,
        }
    }

    /// Request shutdown for every holder of this signal
    pub fn trigger(&self) {
        if self.trigger.send_replace(true) {
            warn!("shutdown already triggered");
        } else {
            info!("shutdown signal triggered");
        }
    }

    /// Check if shutdown has been requested (non-blocking)
    pub fn is_triggered(&self) -> bool {
        *self.state.borrow()
    }

    /// Resolve once shutdown has been requested
    ///
    /// Returns immediately if it already was.
    pub async fn wait(&self) {
        let mut state = self.state.clone();
        // The sender lives as long as `self`, so this cannot observe a closed channel.
        let _ = state.wait_for(|triggered| *triggered).await;
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve on SIGINT (ctrl-c) or, on Unix, SIGTERM
pub async fn termination_requested() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.map(|_| "SIGINT"),
            _ = sigterm.recv() => Ok("SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.map(|_| "ctrl-c")
    }
}
