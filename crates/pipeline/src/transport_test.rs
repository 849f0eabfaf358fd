//! Tests for status classification and endpoint construction

use std::time::Duration;

use super::*;

#[test]
fn test_status_classification() {
    let cases = [
        (100, UploadOutcome::Success),
        (200, UploadOutcome::Success),
        (204, UploadOutcome::Success),
        (299, UploadOutcome::Success),
        (301, UploadOutcome::TransientFailure),
        (399, UploadOutcome::TransientFailure),
        (400, UploadOutcome::PermanentFailure),
        (404, UploadOutcome::PermanentFailure),
        (413, UploadOutcome::PermanentFailure),
        (429, UploadOutcome::TransientFailure),
        (499, UploadOutcome::PermanentFailure),
        (500, UploadOutcome::TransientFailure),
        (503, UploadOutcome::TransientFailure),
        (0, UploadOutcome::TransientFailure),
        (600, UploadOutcome::TransientFailure),
    ];

    for (status, expected) in cases {
        assert_eq!(
            UploadOutcome::from_status(status),
            expected,
            "status {}",
            status
        );
    }
}

#[test]
fn test_deletes_batch() {
    assert!(UploadOutcome::Success.deletes_batch());
    assert!(UploadOutcome::PermanentFailure.deletes_batch());
    assert!(!UploadOutcome::TransientFailure.deletes_batch());
}

#[test]
fn test_endpoints() {
    let config = UploadConfig {
        api_host: "api.example.com/v1/".into(),
        cdn_host: "cdn.example.com/v1".into(),
        request_timeout: Duration::from_secs(1),
        default_integrations: vec![],
    };
    let transport = HttpTransport::new(WriteKey::new("wk").unwrap(), &config).unwrap();

    assert_eq!(transport.upload_url(), "https://api.example.com/v1/b");
    assert_eq!(
        transport.settings_url(),
        "https://cdn.example.com/v1/projects/wk/settings"
    );
}
