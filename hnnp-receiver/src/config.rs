//! Receiver configuration from the environment and an optional env file
//!
//! Handles:
//! - Identity settings (org, receiver, secret) and the backend base URL
//! - Layered lookup: process environment first, then `KEY=VALUE` file
//! - Optional loop tuning (iteration cap, tick interval, request timeout)
//! - Optional health endpoint address
//!
//! Resolution never writes back into the process environment; both layers
//! are captured into plain maps and the config is derived from them.

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

pub const CONFIG_PATH_KEY: &str = "HNNP_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "receiver.env";

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_HEALTH_HOST: &str = "127.0.0.1";

// Lookup order within each setting: first key with a non-empty value wins.
const ORG_ID_KEYS: &[&str] = &["HNNP_ORG_ID", "ORG_ID"];
const RECEIVER_ID_KEYS: &[&str] = &["HNNP_RECEIVER_ID", "RECEIVER_ID"];
const RECEIVER_SECRET_KEYS: &[&str] = &["HNNP_RECEIVER_SECRET", "RECEIVER_SECRET"];
const BACKEND_URL_KEYS: &[&str] = &["HNNP_API_BASE_URL", "HNNP_BACKEND_URL", "API_BASE_URL"];

const MAX_ITERATIONS_KEY: &str = "HNNP_MAX_ITERATIONS";
const TICK_INTERVAL_KEY: &str = "HNNP_TICK_INTERVAL_SECS";
const REQUEST_TIMEOUT_KEY: &str = "HNNP_REQUEST_TIMEOUT_SECS";
const HEALTH_HOST_KEY: &str = "HNNP_HEALTH_HOST";
const HEALTH_PORT_KEY: &str = "HNNP_HEALTH_PORT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("receiver configuration invalid; missing required settings: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("failed to read config file {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Address the health endpoint binds to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthEndpoint {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for HealthEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Validated receiver configuration
///
/// A value of this type always carries non-empty identity, secret and
/// backend URL; partial configurations are rejected by [`ReceiverConfig::resolve`].
#[derive(Clone, PartialEq, Eq)]
pub struct ReceiverConfig {
    pub org_id: String,
    pub receiver_id: String,
    pub receiver_secret: String,
    pub backend_url: String,
    pub max_iterations: Option<u64>,
    pub tick_interval: Duration,
    pub request_timeout: Duration,
    pub health: Option<HealthEndpoint>,
}

// Never print the secret
impl fmt::Debug for ReceiverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceiverConfig")
            .field("org_id", &self.org_id)
            .field("receiver_id", &self.receiver_id)
            .field("receiver_secret", &"<redacted>")
            .field("backend_url", &self.backend_url)
            .field("max_iterations", &self.max_iterations)
            .field("tick_interval", &self.tick_interval)
            .field("request_timeout", &self.request_timeout)
            .field("health", &self.health)
            .finish()
    }
}

/// The two configuration layers, captured as plain maps
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    env: HashMap<String, String>,
    file: HashMap<String, String>,
}

impl ConfigSources {
    pub fn new(env: HashMap<String, String>, file: HashMap<String, String>) -> Self {
        Self { env, file }
    }

    /// Capture the process environment and the env file it points at
    ///
    /// The file path comes from `HNNP_CONFIG_PATH` in the environment,
    /// defaulting to `receiver.env`. A missing file is not an error.
    pub fn from_process() -> Result<Self, ConfigError> {
        let env: HashMap<String, String> = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();

        let path = env
            .get(CONFIG_PATH_KEY)
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_CONFIG_PATH)
            .to_string();

        let file = read_env_file(Path::new(&path))?;
        Ok(Self { env, file })
    }

    /// First non-empty value among `keys`, environment before file for each key
    pub fn lookup(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| {
            [&self.env, &self.file]
                .into_iter()
                .filter_map(|layer| layer.get(*key))
                .map(|value| value.trim())
                .find(|value| !value.is_empty())
        })
    }
}

/// Read a `KEY=VALUE` file into a map without touching the process environment
///
/// Returns an empty map when the file does not exist. See [`parse_env_lines`]
/// for the accepted format.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file, using environment only");
            return Ok(HashMap::new());
        }
        Err(source) => {
            return Err(ConfigError::File {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let values = parse_env_lines(&contents);
    debug!(path = %path.display(), entries = values.len(), "loaded config file");
    Ok(values)
}

/// Parse env-file contents
///
/// Each line is trimmed; blank lines and `#` comments are skipped. The rest
/// split on the first `=` into a trimmed key and value. Values are taken
/// literally: no quote stripping, no `$VAR` expansion. Lines without `=` or
/// with an empty key are ignored. A repeated key keeps its last value.
pub fn parse_env_lines(contents: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();

    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match line.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                values.insert(key.trim().to_string(), value.trim().to_string());
            }
            _ => debug!(line = index + 1, "skipping config line without KEY=VALUE"),
        }
    }

    values
}

impl ReceiverConfig {
    /// Load from the process environment and the optional env file
    pub fn load() -> Result<Self, ConfigError> {
        Self::resolve(&ConfigSources::from_process()?)
    }

    /// Derive a validated config from captured sources
    ///
    /// Missing required settings are reported together. Malformed optional
    /// tuning values are logged and replaced by their defaults.
    pub fn resolve(sources: &ConfigSources) -> Result<Self, ConfigError> {
        let org_id = sources.lookup(ORG_ID_KEYS);
        let receiver_id = sources.lookup(RECEIVER_ID_KEYS);
        let receiver_secret = sources.lookup(RECEIVER_SECRET_KEYS);
        let backend_url = sources.lookup(BACKEND_URL_KEYS);

        let mut missing = Vec::new();
        if org_id.is_none() {
            missing.push("HNNP_ORG_ID");
        }
        if receiver_id.is_none() {
            missing.push("HNNP_RECEIVER_ID");
        }
        if receiver_secret.is_none() {
            missing.push("HNNP_RECEIVER_SECRET");
        }
        if backend_url.is_none() {
            missing.push("HNNP_API_BASE_URL (or HNNP_BACKEND_URL)");
        }

        match (org_id, receiver_id, receiver_secret, backend_url) {
            (Some(org_id), Some(receiver_id), Some(receiver_secret), Some(backend_url)) => {
                Ok(Self {
                    org_id: org_id.to_string(),
                    receiver_id: receiver_id.to_string(),
                    receiver_secret: receiver_secret.to_string(),
                    backend_url: backend_url.to_string(),
                    max_iterations: parse_max_iterations(sources.lookup(&[MAX_ITERATIONS_KEY])),
                    tick_interval: parse_seconds(
                        TICK_INTERVAL_KEY,
                        sources.lookup(&[TICK_INTERVAL_KEY]),
                        DEFAULT_TICK_INTERVAL,
                    ),
                    request_timeout: parse_seconds(
                        REQUEST_TIMEOUT_KEY,
                        sources.lookup(&[REQUEST_TIMEOUT_KEY]),
                        DEFAULT_REQUEST_TIMEOUT,
                    ),
                    health: parse_health_endpoint(
                        sources.lookup(&[HEALTH_HOST_KEY]),
                        sources.lookup(&[HEALTH_PORT_KEY]),
                    ),
                })
            }
            _ => Err(ConfigError::Missing(missing)),
        }
    }
}

/// Iteration cap; 0, absent and invalid values all mean unbounded
pub fn parse_max_iterations(raw: Option<&str>) -> Option<u64> {
    let raw = raw?;
    match raw.parse::<u64>() {
        Ok(0) => None,
        Ok(n) => Some(n),
        Err(_) => {
            warn!(value = %raw, "invalid {MAX_ITERATIONS_KEY}, ignoring");
            None
        }
    }
}

fn parse_seconds(name: &str, raw: Option<&str>, default: Duration) -> Duration {
    let Some(raw) = raw else {
        return default;
    };
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Duration::from_secs(secs),
        _ => {
            warn!(value = %raw, default_secs = default.as_secs(), "invalid {name}, using default");
            default
        }
    }
}

fn parse_health_endpoint(host: Option<&str>, port: Option<&str>) -> Option<HealthEndpoint> {
    let raw = port?;
    match raw.parse::<u16>() {
        Ok(port) if port > 0 => Some(HealthEndpoint {
            host: host.unwrap_or(DEFAULT_HEALTH_HOST).to_string(),
            port,
        }),
        _ => {
            warn!(value = %raw, "invalid {HEALTH_PORT_KEY}, health endpoint disabled");
            None
        }
    }
}
