//! Tests for plugin errors

use super::*;

#[test]
fn test_failed_display() {
    let err = PluginError::failed("boom");
    assert_eq!(err.to_string(), "plugin failed: boom");
}

#[test]
fn test_not_initialized_display() {
    let err = PluginError::not_initialized("identity");
    assert_eq!(err.to_string(), "plugin not initialized: identity");
}

#[test]
fn test_from_storage_error() {
    let err: PluginError = beacon_storage::StorageError::event_too_large(2, 1).into();
    assert!(err.to_string().starts_with("storage error"));
}
