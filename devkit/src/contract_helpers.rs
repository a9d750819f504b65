/*!
Wire contract checks for `/v2/presence` payloads

Validates a JSON body against the fields the backend expects, so tests can
assert on what actually went over the wire rather than on Rust structs.
*/

use serde_json::Value;
use std::fmt;

/// One mismatch between a payload and the presence contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractViolation {
    pub field: String,
    pub problem: String,
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.problem)
    }
}

#[derive(Debug, Clone, Copy)]
enum FieldKind {
    Text,
    /// Hex string of exactly this many characters
    Hex(usize),
    Integer,
    U32,
    U8,
}

const PRESENCE_FIELDS: &[(&str, FieldKind)] = &[
    ("org_id", FieldKind::Text),
    ("receiver_id", FieldKind::Text),
    ("timestamp", FieldKind::Integer),
    ("time_slot", FieldKind::U32),
    ("version", FieldKind::U8),
    ("flags", FieldKind::U8),
    ("token_prefix", FieldKind::Hex(32)),
    ("mac", FieldKind::Hex(16)),
    ("signature", FieldKind::Text),
];

/// Contract of the presence request body
#[derive(Debug, Clone, Copy, Default)]
pub struct PresenceContract {
    /// Reject fields that are not part of the contract
    pub strict: bool,
}

impl PresenceContract {
    pub fn strict() -> Self {
        Self { strict: true }
    }

    /// Field names in wire order
    pub fn field_names() -> Vec<&'static str> {
        PRESENCE_FIELDS.iter().map(|(name, _)| *name).collect()
    }

    /// Check every field; returns all violations found
    pub fn validate(&self, payload: &Value) -> Result<(), Vec<ContractViolation>> {
        let Some(object) = payload.as_object() else {
            return Err(vec![violation("$", "payload is not a JSON object")]);
        };

        let mut violations = Vec::new();
        for (name, kind) in PRESENCE_FIELDS {
            match object.get(*name) {
                None => violations.push(violation(name, "missing")),
                Some(value) => {
                    if let Some(problem) = check_field(value, *kind) {
                        violations.push(violation(name, &problem));
                    }
                }
            }
        }

        if self.strict {
            for key in object.keys() {
                if !PRESENCE_FIELDS.iter().any(|(name, _)| name == key) {
                    violations.push(violation(key, "not part of the contract"));
                }
            }
        }

        // Slot must agree with the timestamp it claims to be derived from.
        if let (Some(ts), Some(slot)) = (
            object.get("timestamp").and_then(Value::as_i64),
            object.get("time_slot").and_then(Value::as_u64),
        ) {
            let expected = hnnp_receiver::time_slot(ts) as u64;
            if slot != expected {
                violations.push(violation(
                    "time_slot",
                    &format!("expected {expected} for timestamp {ts}, got {slot}"),
                ));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// `validate` as an `anyhow` error, for use with `?` in tests
    pub fn check(&self, payload: &Value) -> anyhow::Result<()> {
        self.validate(payload).map_err(|violations| {
            let details: Vec<String> = violations.iter().map(ToString::to_string).collect();
            anyhow::anyhow!("presence contract violated: {}", details.join("; "))
        })
    }
}

fn violation(field: &str, problem: &str) -> ContractViolation {
    ContractViolation {
        field: field.to_string(),
        problem: problem.to_string(),
    }
}

fn check_field(value: &Value, kind: FieldKind) -> Option<String> {
    match kind {
        FieldKind::Text => match value.as_str() {
            Some(s) if !s.is_empty() => None,
            Some(_) => Some("empty string".into()),
            None => Some(format!("expected string, got {value}")),
        },
        FieldKind::Hex(len) => match value.as_str() {
            Some(s) if s.len() != len => Some(format!("expected {len} hex chars, got {}", s.len())),
            Some(s) if !s.chars().all(|c| c.is_ascii_hexdigit()) => Some("not hex".into()),
            Some(_) => None,
            None => Some(format!("expected hex string, got {value}")),
        },
        FieldKind::Integer => match value.as_i64() {
            Some(_) => None,
            None => Some(format!("expected integer, got {value}")),
        },
        FieldKind::U32 => match value.as_u64() {
            Some(n) if n <= u64::from(u32::MAX) => None,
            _ => Some(format!("expected unsigned 32-bit integer, got {value}")),
        },
        FieldKind::U8 => match value.as_u64() {
            Some(n) if n <= u64::from(u8::MAX) => None,
            _ => Some(format!("expected integer 0-255, got {value}")),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestHarness;
    use serde_json::json;

    #[test]
    fn test_generated_report_satisfies_contract() {
        let report = TestHarness::sample_report(1_700_000_007);
        let payload = serde_json::to_value(&report).unwrap();
        PresenceContract::strict().check(&payload).unwrap();
    }

    #[test]
    fn test_reports_every_violation() {
        let payload = json!({
            "org_id": "",
            "receiver_id": "rx",
            "timestamp": 30,
            "time_slot": 5,
            "version": 300,
            "flags": 0,
            "token_prefix": "zz",
            "signature": "sig",
            "extra": true
        });

        let violations = PresenceContract::strict().validate(&payload).unwrap_err();
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();

        assert!(fields.contains(&"org_id"));
        assert!(fields.contains(&"version"));
        assert!(fields.contains(&"token_prefix"));
        assert!(fields.contains(&"mac"));
        assert!(fields.contains(&"extra"));
        assert!(fields.contains(&"time_slot"));
        assert!(!fields.contains(&"flags"));
    }

    #[test]
    fn test_lenient_contract_allows_extra_fields() {
        let mut payload = serde_json::to_value(TestHarness::sample_report(60)).unwrap();
        payload["debug"] = json!("ignored");

        assert!(PresenceContract::default().validate(&payload).is_ok());
        assert!(PresenceContract::strict().validate(&payload).is_err());
    }

    #[test]
    fn test_non_object_payload() {
        let err = PresenceContract::default().validate(&json!([1, 2])).unwrap_err();
        assert_eq!(err[0].field, "$");
    }

    #[test]
    fn test_field_names_order() {
        assert_eq!(PresenceContract::field_names().len(), 9);
        assert_eq!(PresenceContract::field_names()[0], "org_id");
    }
}
