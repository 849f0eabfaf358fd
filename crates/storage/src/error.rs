//! Storage error types

use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in the batch and preference stores
#[derive(Debug, Error)]
pub enum StorageError {
    /// Event exceeds the per-event cap and was not admitted
    #[error("event too large: {len} bytes exceeds maximum {max} bytes")]
    EventTooLarge {
        /// Serialized size of the event
        len: usize,
        /// Maximum allowed size
        max: usize,
    },

    /// Underlying medium failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key cannot be used with this operation
    #[error("unsupported key: {0}")]
    UnsupportedKey(&'static str),
}

impl StorageError {
    /// Create an EventTooLarge error
    pub fn event_too_large(len: usize, max: usize) -> Self {
        Self::EventTooLarge { len, max }
    }

    /// Whether this error rejected an event at admission
    pub fn is_admission(&self) -> bool {
        matches!(self, Self::EventTooLarge { .. })
    }
}
