//! Presence report model (matches the `/v2/presence` request body)
//!
//! A report is built fresh on every tick and dropped after delivery. Its
//! `time_slot` is the index of the protocol rotation window containing the
//! report timestamp.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::ReceiverConfig;
use crate::credentials::CredentialSupplier;

/// Length of one protocol rotation window in seconds
pub const ROTATION_WINDOW_SECS: i64 = 15;
pub const PROTOCOL_VERSION: u8 = 0x02;
pub const DEFAULT_FLAGS: u8 = 0x00;

/// Rotation window index for an epoch timestamp: `floor(timestamp / 15)`
///
/// Timestamps before the epoch clamp to slot 0.
pub fn time_slot(timestamp: i64) -> u32 {
    timestamp
        .div_euclid(ROTATION_WINDOW_SECS)
        .clamp(0, i64::from(u32::MAX)) as u32
}

/// Presence report sent to the cloud backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresenceReport {
    pub org_id: String,
    pub receiver_id: String,
    pub timestamp: i64,
    pub time_slot: u32,
    pub version: u8,
    pub flags: u8,
    pub token_prefix: String,
    pub mac: String,
    pub signature: String,
}

impl PresenceReport {
    /// Build the report for `now`, pulling credential fields from `supplier`
    pub fn new(config: &ReceiverConfig, now: DateTime<Utc>, supplier: &dyn CredentialSupplier) -> Self {
        let timestamp = now.timestamp();
        let time_slot = time_slot(timestamp);
        let credentials = supplier.credentials(config, timestamp, time_slot);

        Self {
            org_id: config.org_id.clone(),
            receiver_id: config.receiver_id.clone(),
            timestamp,
            time_slot,
            version: PROTOCOL_VERSION,
            flags: DEFAULT_FLAGS,
            token_prefix: credentials.token_prefix,
            mac: credentials.mac,
            signature: credentials.signature,
        }
    }
}
