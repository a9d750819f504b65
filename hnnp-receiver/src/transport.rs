//! HTTP delivery of presence reports to the cloud backend
//!
//! Features:
//! - One POST to `{base_url}/v2/presence` per report, no internal retry
//! - Fixed overall request timeout set on the client
//! - Distinct errors for serialization, URL, network and status failures
//! - [`PresenceSink`] seam so the scheduler can run against other sinks

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::debug;
use url::Url;

pub use reqwest::StatusCode;

use crate::report::PresenceReport;

pub const PRESENCE_PATH: &str = "/v2/presence";

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to serialize presence report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid presence endpoint {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("presence request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("presence rejected by {url}: {status}")]
    Status { url: String, status: StatusCode },
}

impl DeliveryError {
    /// HTTP status for rejected deliveries
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Destination for presence reports
#[async_trait]
pub trait PresenceSink: Send + Sync {
    /// Deliver one report; a single attempt
    async fn deliver(&self, report: &PresenceReport) -> Result<(), DeliveryError>;
}

/// Strip surrounding whitespace and trailing slashes from a base URL
pub fn normalize_base_url(raw: &str) -> &str {
    raw.trim().trim_end_matches('/')
}

/// Full presence endpoint for a (possibly unnormalized) base URL
pub fn presence_endpoint(base_url: &str) -> String {
    format!("{}{}", normalize_base_url(base_url), PRESENCE_PATH)
}

/// reqwest-backed presence delivery
#[derive(Debug, Clone)]
pub struct PresenceTransport {
    client: reqwest::Client,
    base_url: String,
    endpoint: String,
}

impl PresenceTransport {
    /// Build the HTTP client with the given overall request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("hnnp-receiver/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: normalize_base_url(base_url).to_string(),
            endpoint: presence_endpoint(base_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Serialize and POST one report
    ///
    /// Any 2xx status is success; the response body is not read.
    pub async fn deliver_presence(&self, report: &PresenceReport) -> Result<(), DeliveryError> {
        let body = serde_json::to_vec(report)?;

        let url = Url::parse(&self.endpoint).map_err(|source| DeliveryError::InvalidUrl {
            url: self.endpoint.clone(),
            source,
        })?;

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|source| DeliveryError::Network {
                url: self.endpoint.clone(),
                source,
            })?;

        // Dropping the response here releases the connection back to the pool.
        let status = response.status();
        drop(response);

        if !status.is_success() {
            return Err(DeliveryError::Status {
                url: self.endpoint.clone(),
                status,
            });
        }

        debug!(url = %self.endpoint, status = status.as_u16(), "presence delivered");
        Ok(())
    }
}

#[async_trait]
impl PresenceSink for PresenceTransport {
    async fn deliver(&self, report: &PresenceReport) -> Result<(), DeliveryError> {
        self.deliver_presence(report).await
    }
}
