//! Forwarding to the upstream streaming provider

use chat_relay_protocol::UpstreamEnvelope;
use tracing::{debug, warn};

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};

/// HTTP client bound to the upstream `stream_run` endpoint
#[derive(Debug, Clone)]
pub struct Upstream {
    http: reqwest::Client,
    url: String,
}

impl Upstream {
    pub fn new(config: &RelayConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| RelayError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url: config.upstream_url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST the envelope and return the response once its status is 2xx.
    ///
    /// A non-2xx answer is read to the end and turned into
    /// [`RelayError::Upstream`]. Nothing is retried.
    pub async fn forward(
        &self,
        envelope: &UpstreamEnvelope,
        credential: &str,
    ) -> Result<reqwest::Response> {
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(credential)
            .json(envelope)
            .send()
            .await?;

        let status = response.status();
        debug!(status = status.as_u16(), "upstream responded");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|e| {
                warn!(error = %e, "failed to read upstream error body");
                String::new()
            });
            return Err(RelayError::Upstream { status, body });
        }

        Ok(response)
    }
}
