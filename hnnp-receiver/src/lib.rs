//! HNNP Receiver - presence reporting daemon for field receivers
//!
//! This crate drives the receiver's presence-reporting cycle:
//! - Layered configuration from the environment and an optional env file
//! - Per-tick presence reports keyed by the 15s protocol rotation window
//! - HTTP delivery to `POST {backend}/v2/presence` with timeout and status checks
//! - A serial scheduling loop with cooperative shutdown and an iteration cap
//! - Health tracking with an optional `/health` endpoint

pub mod config;
pub mod credentials;
pub mod health;
pub mod report;
pub mod scheduler;
pub mod shutdown;
pub mod transport;

pub use config::{ConfigError, ConfigSources, ReceiverConfig};
pub use credentials::{CredentialSupplier, Credentials, PlaceholderCredentials};
pub use health::{HealthTracker, ReceiverHealth};
pub use report::{time_slot, PresenceReport};
pub use scheduler::{RunSummary, Scheduler, SchedulerSettings, StopReason};
pub use shutdown::ShutdownSignal;
pub use transport::{DeliveryError, PresenceSink, PresenceTransport};
