//! Beacon Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Only `write_key` is required; every section falls back to defaults.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use beacon_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("write_key = \"abc\"").unwrap();
//! assert_eq!(config.pipeline.flush_at, 20);
//! ```
//!
//! # Example Full Config
//!
//! ```toml
//! write_key = "abc"
//!
//! [log]
//! level = "debug"
//! format = "json"
//!
//! [storage]
//! root = "/var/lib/beacon"
//! medium = "file"
//!
//! [pipeline]
//! flush_at = 50
//! flush_interval = "10s"
//! flush_on_startup = true
//! queue_size = 1000
//! flush_timeout = "5s"
//!
//! [upload]
//! api_host = "api.segment.io/v1"
//! cdn_host = "cdn-settings.segment.com/v1"
//! request_timeout = "15s"
//! ```

mod error;
mod logging;
mod pipeline;
mod storage;
mod upload;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use pipeline::{DEFAULT_FLUSH_AT, PipelineConfig};
pub use storage::{StorageConfig, StorageMedium};
pub use upload::UploadConfig;

use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source write key (required)
    pub write_key: String,

    /// Logging configuration
    pub log: LogConfig,

    /// Local storage layout
    pub storage: StorageConfig,

    /// Event pipeline and flush policies
    pub pipeline: PipelineConfig,

    /// Remote collector endpoints
    pub upload: UploadConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Build a default configuration for a write key
    ///
    /// Useful for tests and embedding, where no TOML file is involved.
    pub fn for_write_key(write_key: impl Into<String>) -> Self {
        Self {
            write_key: write_key.into(),
            ..Self::default()
        }
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_str("write_key = \"abc\"").unwrap();
        assert_eq!(config.write_key, "abc");
        assert_eq!(config.pipeline.flush_at, DEFAULT_FLUSH_AT);
        assert_eq!(config.storage.medium, StorageMedium::File);
        assert_eq!(config.upload.api_host, "api.segment.io/v1");
    }

    #[test]
    fn test_missing_write_key_rejected() {
        let err = Config::from_str("").unwrap_err();
        assert!(err.to_string().contains("write_key"));
    }

    #[test]
    fn test_full_config_parse() {
        let toml = r#"
write_key = "abc"

[log]
level = "debug"
format = "json"

[storage]
root = "/tmp/beacon"
medium = "memory"

[pipeline]
flush_at = 50
flush_interval = "10s"
flush_on_startup = false
queue_size = 64
flush_timeout = "2s"

[upload]
api_host = "collector.example.com/v1"
cdn_host = "cdn.example.com/v1"
request_timeout = "3s"
default_integrations = []
"#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.storage.root.to_str(), Some("/tmp/beacon"));
        assert_eq!(config.storage.medium, StorageMedium::Memory);
        assert_eq!(config.pipeline.flush_at, 50);
        assert_eq!(config.pipeline.flush_interval, Duration::from_secs(10));
        assert!(!config.pipeline.flush_on_startup);
        assert_eq!(config.pipeline.queue_size, 64);
        assert_eq!(config.pipeline.flush_timeout, Duration::from_secs(2));
        assert_eq!(config.upload.api_host, "collector.example.com/v1");
        assert_eq!(config.upload.request_timeout, Duration::from_secs(3));
        assert!(config.upload.default_integrations.is_empty());
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_str("write_key = ");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_from_file_missing() {
        let result = Config::from_file("/definitely/not/here.toml");
        assert!(matches!(result, Err(ConfigError::IoError { .. })));
    }

    #[test]
    fn test_for_write_key_is_valid() {
        let config = Config::for_write_key("abc");
        assert!(config.validate().is_ok());
    }
}
