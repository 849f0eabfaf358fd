//! Remote collector configuration

use std::time::Duration;

use serde::Deserialize;

/// Upload endpoints and timeouts
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Collector host (batches are posted to `https://<api_host>/b`)
    pub api_host: String,

    /// Settings CDN host
    pub cdn_host: String,

    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Destinations assumed enabled before any settings are known
    pub default_integrations: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            api_host: "api.segment.io/v1".into(),
            cdn_host: "cdn-settings.segment.com/v1".into(),
            request_timeout: Duration::from_secs(15),
            default_integrations: vec!["Segment.io".into()],
        }
    }
}
