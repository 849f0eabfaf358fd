//! Configuration validation
//!
//! Checks fields serde cannot: non-empty write key and hosts, non-zero
//! queue and pool sizes.

use crate::Config;
use crate::error::{ConfigError, Result};

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.write_key.trim().is_empty() {
        return Err(ConfigError::missing_field("root", "write_key"));
    }

    let pipeline = &config.pipeline;
    if pipeline.queue_size == 0 {
        return Err(ConfigError::invalid_value(
            "pipeline",
            "queue_size",
            "must be at least 1",
        ));
    }
    if pipeline.file_io_concurrency == 0 {
        return Err(ConfigError::invalid_value(
            "pipeline",
            "file_io_concurrency",
            "must be at least 1",
        ));
    }
    if pipeline.network_io_concurrency == 0 {
        return Err(ConfigError::invalid_value(
            "pipeline",
            "network_io_concurrency",
            "must be at least 1",
        ));
    }

    if config.upload.api_host.trim().is_empty() {
        return Err(ConfigError::missing_field("upload", "api_host"));
    }
    if config.upload.cdn_host.trim().is_empty() {
        return Err(ConfigError::missing_field("upload", "cdn_host"));
    }

    Ok(())
}
