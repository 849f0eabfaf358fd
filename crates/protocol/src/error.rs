//! Protocol error types
//!
//! Errors that can occur when building or serializing events.

use thiserror::Error;

/// Errors that can occur during protocol operations
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Event could not be serialized to JSON
    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Event is structurally invalid
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// Write key is empty
    #[error("write key must not be empty")]
    EmptyWriteKey,
}

impl ProtocolError {
    /// Create an invalid event error
    pub fn invalid_event(msg: impl Into<String>) -> Self {
        Self::InvalidEvent(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::invalid_event("missing name");
        assert_eq!(err.to_string(), "invalid event: missing name");

        let err = ProtocolError::EmptyWriteKey;
        assert!(err.to_string().contains("write key"));
    }
}
