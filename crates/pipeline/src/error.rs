//! Pipeline error types

use std::time::Duration;

use thiserror::Error;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Pipeline has not been started, or was stopped
    #[error("pipeline '{0}' is not running")]
    NotRunning(String),

    /// Synchronous flush did not complete in time
    #[error("flush not acknowledged within {0:?}")]
    FlushTimeout(Duration),

    /// Pipeline stopped before acknowledging a flush
    #[error("flush cancelled: pipeline stopped")]
    FlushCancelled,

    /// Worker pool closed or a worker task panicked
    #[error("worker failed: {0}")]
    Worker(String),

    /// Batch or preference storage failed
    #[error("storage error: {0}")]
    Storage(#[from] beacon_storage::StorageError),

    /// Event could not be serialized
    #[error("protocol error: {0}")]
    Protocol(#[from] beacon_protocol::ProtocolError),

    /// HTTP client could not be built or a request failed
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl PipelineError {
    /// Create a not running error
    pub fn not_running(name: impl Into<String>) -> Self {
        Self::NotRunning(name.into())
    }

    /// Create a worker error
    pub fn worker(msg: impl Into<String>) -> Self {
        Self::Worker(msg.into())
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
