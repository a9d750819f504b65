/*!
# HNNP DevKit - Test support for the receiver daemon

Helpers for exercising the presence-reporting cycle without a backend:
- Scriptable mock presence sink (accept, reject, latency)
- Wire contract checks for `/v2/presence` payloads
- Harness wiring config fixtures, env files and a scheduler run
*/

pub mod mock_sink;
pub mod contract_helpers;
pub mod test_utils;

pub use mock_sink::{MockOutcome, MockPresenceSink};
pub use contract_helpers::{ContractViolation, PresenceContract};
pub use test_utils::TestHarness;
