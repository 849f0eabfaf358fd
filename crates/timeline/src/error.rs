//! Plugin error types

use thiserror::Error;

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

/// Errors a plugin can raise while handling an event
#[derive(Debug, Error)]
pub enum PluginError {
    /// Plugin logic failed
    #[error("plugin failed: {0}")]
    Failed(String),

    /// Plugin is not ready to handle events
    #[error("plugin not initialized: {0}")]
    NotInitialized(String),

    /// Persisting plugin state failed
    #[error("storage error: {0}")]
    Storage(#[from] beacon_storage::StorageError),

    /// Event could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PluginError {
    /// Create a failed error
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    /// Create a not initialized error
    pub fn not_initialized(name: impl Into<String>) -> Self {
        Self::NotInitialized(name.into())
    }
}
