//! Write key identification
//!
//! `WriteKey` identifies the source project. It scopes every piece of local
//! state (preference file, batch directory, file-index cursor) and is sent
//! in the batch footer and as the upload credential.

use std::fmt;

use crate::ProtocolError;

/// Source write key
///
/// # Example
///
/// ```
/// use beacon_protocol::WriteKey;
///
/// let key = WriteKey::new("abc123").unwrap();
/// assert_eq!(key.as_str(), "abc123");
/// assert_eq!(key.file_index_key(), "segment.events.file.index.abc123");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WriteKey(String);

impl WriteKey {
    /// Create a new write key, rejecting empty strings
    pub fn new(key: impl Into<String>) -> Result<Self, ProtocolError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ProtocolError::EmptyWriteKey);
        }
        Ok(Self(key))
    }

    /// Get the write key as a string slice
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Preference key holding this write key's batch file cursor
    pub fn file_index_key(&self) -> String {
        format!("segment.events.file.index.{}", self.0)
    }

    /// Base name of the batch file with the given index
    pub fn batch_file_name(&self, index: i64) -> String {
        format!("{}-{}", self.0, index)
    }
}

impl fmt::Display for WriteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for WriteKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty() {
        assert!(WriteKey::new("").is_err());
        assert!(WriteKey::new("   ").is_err());
    }

    #[test]
    fn test_batch_file_name() {
        let key = WriteKey::new("wk").unwrap();
        assert_eq!(key.batch_file_name(0), "wk-0");
        assert_eq!(key.batch_file_name(12), "wk-12");
    }

    #[test]
    fn test_display() {
        let key = WriteKey::new("wk").unwrap();
        assert_eq!(format!("{}", key), "wk");
    }
}
