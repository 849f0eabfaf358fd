//! Event pipeline configuration
//!
//! Covers the write channel, the three flush policies and the worker pool
//! sizes.

use std::time::Duration;

use serde::Deserialize;

/// Default count-policy threshold
pub const DEFAULT_FLUSH_AT: usize = 20;

/// Pipeline configuration
///
/// ```toml
/// [pipeline]
/// flush_at = 20
/// flush_interval = "30s"
/// flush_on_startup = true
/// queue_size = 1000
/// flush_timeout = "5s"
/// file_io_concurrency = 2
/// network_io_concurrency = 1
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Events admitted before an automatic upload (values < 1 mean default)
    pub flush_at: usize,

    /// Period of the frequency policy; zero disables it
    #[serde(with = "humantime_serde")]
    pub flush_interval: Duration,

    /// Flush once when the pipeline starts
    pub flush_on_startup: bool,

    /// Write channel capacity
    pub queue_size: usize,

    /// How long a synchronous flush waits for its acknowledgement
    #[serde(with = "humantime_serde")]
    pub flush_timeout: Duration,

    /// Concurrent file-I/O operations
    pub file_io_concurrency: usize,

    /// Concurrent uploads per pipeline
    pub network_io_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            flush_at: DEFAULT_FLUSH_AT,
            flush_interval: Duration::from_secs(30),
            flush_on_startup: true,
            queue_size: 1000,
            flush_timeout: Duration::from_secs(5),
            file_io_concurrency: 2,
            network_io_concurrency: 1,
        }
    }
}

impl PipelineConfig {
    /// Count threshold with values < 1 coerced to the default
    pub fn effective_flush_at(&self) -> usize {
        if self.flush_at < 1 {
            DEFAULT_FLUSH_AT
        } else {
            self.flush_at
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.flush_at, 20);
        assert_eq!(config.flush_interval, Duration::from_secs(30));
        assert!(config.flush_on_startup);
        assert_eq!(config.file_io_concurrency, 2);
        assert_eq!(config.network_io_concurrency, 1);
    }

    #[test]
    fn test_flush_at_coerced() {
        let config: PipelineConfig = toml::from_str("flush_at = 0").unwrap();
        assert_eq!(config.effective_flush_at(), DEFAULT_FLUSH_AT);

        let config: PipelineConfig = toml::from_str("flush_at = 7").unwrap();
        assert_eq!(config.effective_flush_at(), 7);
    }

    #[test]
    fn test_duration_variants() {
        for (s, expected) in [
            ("500ms", Duration::from_millis(500)),
            ("10s", Duration::from_secs(10)),
            ("2m", Duration::from_secs(120)),
            ("0s", Duration::ZERO),
        ] {
            let config: PipelineConfig =
                toml::from_str(&format!("flush_interval = \"{}\"", s)).unwrap();
            assert_eq!(config.flush_interval, expected, "Failed for {}", s);
        }
    }
}
