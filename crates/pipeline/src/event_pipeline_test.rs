//! Tests for pipeline lifecycle and the writer/uploader tasks

use std::sync::atomic::{AtomicUsize, Ordering};

use beacon_protocol::{Settings, WriteKey};
use serde_json::json;

use super::*;
use crate::policy::CountPolicy;

#[derive(Default)]
struct AcceptAll {
    uploads: AtomicUsize,
}

#[async_trait]
impl Transport for AcceptAll {
    async fn upload(&self, _batch: Bytes) -> UploadOutcome {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        UploadOutcome::Success
    }

    async fn fetch_settings(&self) -> Option<Settings> {
        None
    }
}

/// Never finishes an upload
struct Stalled;

#[async_trait]
impl Transport for Stalled {
    async fn upload(&self, _batch: Bytes) -> UploadOutcome {
        std::future::pending::<()>().await;
        UploadOutcome::Success
    }

    async fn fetch_settings(&self) -> Option<Settings> {
        None
    }
}

const WAIT: Duration = Duration::from_secs(5);

fn storage() -> Arc<BatchStore> {
    Arc::new(BatchStore::in_memory(WriteKey::new("wk").unwrap()))
}

fn pipeline(transport: Arc<dyn Transport>) -> EventPipeline {
    EventPipeline::builder("test", storage(), transport).build()
}

#[tokio::test]
async fn test_flush_and_wait_requires_running() {
    let pipeline = pipeline(Arc::new(AcceptAll::default()));
    assert!(!pipeline.is_running());

    let err = pipeline.flush_and_wait(WAIT).await.unwrap_err();
    assert!(matches!(err, PipelineError::NotRunning(_)));
}

#[tokio::test]
async fn test_put_while_stopped_is_dropped() {
    let pipeline = pipeline(Arc::new(AcceptAll::default()));

    pipeline.put(Event::track("lost")).await;

    assert_eq!(pipeline.metrics().events_enqueued, 0);
    assert!(pipeline.storage().pending_batches().unwrap().is_empty());
}

#[tokio::test]
async fn test_flush_uploads_written_events() {
    let transport = Arc::new(AcceptAll::default());
    let pipeline = pipeline(transport.clone());
    pipeline.start().unwrap();

    pipeline.put(Event::track("a")).await;
    pipeline.put(Event::track("b")).await;
    pipeline.flush_and_wait(WAIT).await.unwrap();

    let m = pipeline.metrics();
    assert_eq!(m.events_enqueued, 2);
    assert_eq!(m.events_written, 2);
    assert_eq!(m.upload_cycles, 1);
    assert_eq!(m.batches_uploaded, 1);
    assert_eq!(transport.uploads.load(Ordering::SeqCst), 1);
    assert!(pipeline.storage().pending_batches().unwrap().is_empty());

    pipeline.stop();
}

#[tokio::test]
async fn test_empty_flush_still_acknowledges() {
    let transport = Arc::new(AcceptAll::default());
    let pipeline = pipeline(transport.clone());
    pipeline.start().unwrap();

    pipeline.flush_and_wait(WAIT).await.unwrap();

    assert_eq!(pipeline.metrics().upload_cycles, 1);
    assert_eq!(transport.uploads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_oversized_event_is_rejected() {
    let pipeline = pipeline(Arc::new(AcceptAll::default()));
    pipeline.start().unwrap();

    let huge = Event::track("big").with_field("blob", json!("x".repeat(40_000)));
    pipeline.put(huge).await;
    pipeline.put(Event::track("small")).await;
    pipeline.flush_and_wait(WAIT).await.unwrap();

    let m = pipeline.metrics();
    assert_eq!(m.events_rejected, 1);
    assert_eq!(m.events_written, 1);
}

#[tokio::test]
async fn test_start_is_idempotent_and_restartable() {
    let pipeline = pipeline(Arc::new(AcceptAll::default()));

    pipeline.start().unwrap();
    pipeline.start().unwrap();
    assert!(pipeline.is_running());

    pipeline.stop();
    assert!(!pipeline.is_running());
    pipeline.stop();

    // Fresh channels after restart
    pipeline.start().unwrap();
    pipeline.put(Event::track("again")).await;
    pipeline.flush_and_wait(WAIT).await.unwrap();
    assert_eq!(pipeline.metrics().batches_uploaded, 1);
}

#[tokio::test]
async fn test_flush_times_out() {
    let pipeline = pipeline(Arc::new(Stalled));
    pipeline.start().unwrap();

    pipeline.put(Event::track("stuck")).await;
    let err = pipeline
        .flush_and_wait(Duration::from_millis(50))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::FlushTimeout(_)));
    pipeline.stop();
}

#[tokio::test]
async fn test_count_policy_resets_after_flush() {
    let count = Arc::new(CountPolicy::new(2));
    let pipeline = EventPipeline::builder("test", storage(), Arc::new(AcceptAll::default()))
        .policy(count.clone())
        .build();
    pipeline.start().unwrap();

    pipeline.put(Event::track("a")).await;
    pipeline.put(Event::track("b")).await;
    pipeline.put(Event::track("c")).await;
    pipeline.flush_and_wait(WAIT).await.unwrap();

    // One signal after "b", one for the explicit flush
    assert_eq!(pipeline.metrics().flushes_requested, 2);
    assert_eq!(count.count(), 0);
}
