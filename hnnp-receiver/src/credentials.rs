//! Credential material attached to each presence report
//!
//! The protocol carries a token prefix, a MAC and a signature derived from
//! the receiver secret. Their derivation is supplied from outside through
//! [`CredentialSupplier`], so a real signer can replace the placeholders
//! without touching the scheduler or the transport.

use crate::config::ReceiverConfig;

/// Placeholder token prefix: 16 zero bytes, hex encoded
pub const PLACEHOLDER_TOKEN_PREFIX: &str = "00000000000000000000000000000000";
/// Placeholder MAC: 8 zero bytes, hex encoded
pub const PLACEHOLDER_MAC: &str = "0000000000000000";
pub const PLACEHOLDER_SIGNATURE: &str = "stub-signature-no-hmac";

/// The three credential fields of a presence report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token_prefix: String,
    pub mac: String,
    pub signature: String,
}

/// Produces credential fields for one report
///
/// Called once per tick with the report's timestamp and time slot.
pub trait CredentialSupplier: Send + Sync {
    fn credentials(&self, config: &ReceiverConfig, timestamp: i64, time_slot: u32) -> Credentials;
}

impl<F> CredentialSupplier for F
where
    F: Fn(&ReceiverConfig, i64, u32) -> Credentials + Send + Sync,
{
    fn credentials(&self, config: &ReceiverConfig, timestamp: i64, time_slot: u32) -> Credentials {
        self(config, timestamp, time_slot)
    }
}

/// Fixed placeholder values, used until real signing is wired in
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderCredentials;

impl CredentialSupplier for PlaceholderCredentials {
    fn credentials(&self, _config: &ReceiverConfig, _timestamp: i64, _time_slot: u32) -> Credentials {
        Credentials {
            token_prefix: PLACEHOLDER_TOKEN_PREFIX.to_string(),
            mac: PLACEHOLDER_MAC.to_string(),
            signature: PLACEHOLDER_SIGNATURE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigSources, ReceiverConfig};
    use std::collections::HashMap;

    fn config() -> ReceiverConfig {
        let env = [
            ("HNNP_ORG_ID", "org"),
            ("HNNP_RECEIVER_ID", "rx"),
            ("HNNP_RECEIVER_SECRET", "secret"),
            ("HNNP_BACKEND_URL", "http://localhost"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        ReceiverConfig::resolve(&ConfigSources::new(env, HashMap::new())).unwrap()
    }

    #[test]
    fn test_placeholder_shapes() {
        let creds = PlaceholderCredentials.credentials(&config(), 0, 0);
        assert_eq!(creds.token_prefix.len(), 32);
        assert_eq!(creds.mac.len(), 16);
        assert!(creds.token_prefix.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(creds.mac.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(creds.signature, PLACEHOLDER_SIGNATURE);
    }

    #[test]
    fn test_closure_supplier() {
        let supplier = |cfg: &ReceiverConfig, ts: i64, slot: u32| Credentials {
            token_prefix: format!("{:032x}", slot),
            mac: format!("{:016x}", ts),
            signature: format!("signed-by-{}", cfg.receiver_id),
        };

        let creds = supplier.credentials(&config(), 30, 2);
        assert_eq!(creds.token_prefix, format!("{:032x}", 2));
        assert_eq!(creds.mac, format!("{:016x}", 30));
        assert_eq!(creds.signature, "signed-by-rx");
    }
}
