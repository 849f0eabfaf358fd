//! Upload transport
//!
//! The pipeline only needs two calls from the network: post a finalized
//! batch and fetch the settings snapshot. [`HttpTransport`] speaks the
//! collector's HTTP API; tests substitute their own implementation.

use async_trait::async_trait;
use beacon_config::UploadConfig;
use beacon_protocol::{Settings, WriteKey};
use bytes::Bytes;

use crate::Result;

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;

/// Classified result of one batch upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Collector accepted the batch; delete it
    Success,
    /// Retry on the next cycle; keep the batch
    TransientFailure,
    /// Collector rejected the batch; delete it to avoid retrying forever
    PermanentFailure,
}

impl UploadOutcome {
    /// Classify an HTTP status code
    ///
    /// 1xx/2xx succeed, 429 and 3xx are retried, other 4xx are permanent,
    /// everything else is retried.
    pub fn from_status(status: u16) -> Self {
        match status {
            100..=299 => Self::Success,
            300..=399 | 429 => Self::TransientFailure,
            400..=499 => Self::PermanentFailure,
            _ => Self::TransientFailure,
        }
    }

    /// Whether the batch should be removed from local storage
    #[inline]
    pub fn deletes_batch(&self) -> bool {
        !matches!(self, Self::TransientFailure)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::TransientFailure => "transient_failure",
            Self::PermanentFailure => "permanent_failure",
        }
    }
}

/// Network collaborator of the pipeline
#[async_trait]
pub trait Transport: Send + Sync {
    /// Upload one finalized batch
    ///
    /// Network errors are reported as [`UploadOutcome::TransientFailure`].
    async fn upload(&self, batch: Bytes) -> UploadOutcome;

    /// Fetch the current settings snapshot, if reachable
    async fn fetch_settings(&self) -> Option<Settings>;
}

/// Transport posting batches to the collector over HTTPS
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    write_key: WriteKey,
    upload_url: String,
    settings_url: String,
}

impl HttpTransport {
    /// Build a transport for a write key
    pub fn new(write_key: WriteKey, config: &UploadConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            upload_url: upload_url(&config.api_host),
            settings_url: settings_url(&config.cdn_host, &write_key),
            client,
            write_key,
        })
    }

    /// Batch upload endpoint
    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    /// Settings endpoint
    pub fn settings_url(&self) -> &str {
        &self.settings_url
    }
}

fn upload_url(api_host: &str) -> String {
    format!("https://{}/b", api_host.trim_end_matches('/'))
}

fn settings_url(cdn_host: &str, write_key: &WriteKey) -> String {
    format!(
        "https://{}/projects/{}/settings",
        cdn_host.trim_end_matches('/'),
        write_key
    )
}

#[async_trait]
impl Transport for HttpTransport {
    async fn upload(&self, batch: Bytes) -> UploadOutcome {
        let len = batch.len();
        let response = self
            .client
            .post(&self.upload_url)
            .basic_auth(self.write_key.as_str(), None::<&str>)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(batch)
            .send()
            .await;

        match response {
            Ok(response) => {
                let status = response.status().as_u16();
                let outcome = UploadOutcome::from_status(status);
                tracing::debug!(
                    status,
                    bytes = len,
                    outcome = outcome.as_str(),
                    "batch upload finished"
                );
                outcome
            }
            Err(e) => {
                tracing::warn!(error = %e, bytes = len, "batch upload failed");
                UploadOutcome::TransientFailure
            }
        }
    }

    async fn fetch_settings(&self) -> Option<Settings> {
        let response = match self.client.get(&self.settings_url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "settings fetch failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "settings fetch rejected");
            return None;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "settings body unreadable");
                return None;
            }
        };

        match serde_json::from_str::<Settings>(&body) {
            Ok(settings) => Some(settings),
            Err(e) => {
                tracing::warn!(error = %e, "settings body malformed");
                None
            }
        }
    }
}
