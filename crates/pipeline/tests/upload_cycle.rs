//! End-to-end tests for the write and upload cycle
//!
//! Events go through a real file-backed batch store; the transport is
//! scripted in-process so each upload outcome can be chosen per call.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use beacon_pipeline::{
    CountPolicy, EventPipeline, FrequencyPolicy, StartupPolicy, Transport, UploadOutcome,
};
use beacon_protocol::{Event, Settings, WriteKey};
use beacon_storage::BatchStore;
use bytes::Bytes;
use parking_lot::Mutex;
use tempfile::TempDir;

const WAIT: Duration = Duration::from_secs(5);

/// Transport answering with queued outcomes, then `fallback`
struct ScriptedTransport {
    script: Mutex<VecDeque<UploadOutcome>>,
    fallback: UploadOutcome,
    received: Mutex<Vec<Bytes>>,
}

impl ScriptedTransport {
    fn new(script: impl IntoIterator<Item = UploadOutcome>, fallback: UploadOutcome) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            received: Mutex::new(Vec::new()),
        })
    }

    fn accepting() -> Arc<Self> {
        Self::new([], UploadOutcome::Success)
    }

    fn received(&self) -> Vec<Bytes> {
        self.received.lock().clone()
    }

    /// Events across every received batch
    fn event_count(&self) -> usize {
        self.received()
            .iter()
            .map(|b| {
                let v: serde_json::Value = serde_json::from_slice(b).unwrap();
                v["batch"].as_array().unwrap().len()
            })
            .sum()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn upload(&self, batch: Bytes) -> UploadOutcome {
        self.received.lock().push(batch);
        self.script.lock().pop_front().unwrap_or(self.fallback)
    }

    async fn fetch_settings(&self) -> Option<Settings> {
        None
    }
}

fn file_store(dir: &TempDir) -> Arc<BatchStore> {
    Arc::new(BatchStore::open_file(dir.path(), WriteKey::new("wk").unwrap()).unwrap())
}

/// Poll until `cond` holds or fail after a few seconds
async fn eventually(mut cond: impl FnMut() -> bool) {
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn test_count_threshold_fires_once_for_25_events() {
    let dir = TempDir::new().unwrap();
    let transport = ScriptedTransport::accepting();
    let pipeline = EventPipeline::builder("Segment.io", file_store(&dir), transport.clone())
        .policy(Arc::new(CountPolicy::new(20)))
        .build();
    pipeline.start().unwrap();

    for i in 0..25 {
        pipeline.put(Event::track(format!("event-{i}"))).await;
    }

    eventually(|| pipeline.metrics().events_written == 25).await;
    eventually(|| pipeline.metrics().upload_cycles == 1).await;

    // Exactly one automatic signal, after the 20th event
    assert_eq!(pipeline.metrics().flushes_requested, 1);

    // The remainder only leaves on an explicit flush
    pipeline.flush_and_wait(WAIT).await.unwrap();
    assert_eq!(pipeline.metrics().flushes_requested, 2);
    assert_eq!(transport.event_count(), 25);
    assert!(pipeline.storage().pending_batches().unwrap().is_empty());

    pipeline.stop();
}

#[tokio::test]
async fn test_permanent_failure_deletes_batch() {
    let dir = TempDir::new().unwrap();
    let transport = ScriptedTransport::new([UploadOutcome::from_status(404)], UploadOutcome::Success);
    let pipeline = EventPipeline::builder("Segment.io", file_store(&dir), transport.clone()).build();
    pipeline.start().unwrap();

    pipeline.put(Event::track("rejected")).await;
    pipeline.flush_and_wait(WAIT).await.unwrap();

    assert_eq!(transport.received().len(), 1);
    assert!(pipeline.storage().pending_batches().unwrap().is_empty());
    assert_eq!(pipeline.metrics().batches_discarded, 1);
    assert_eq!(pipeline.metrics().batches_uploaded, 0);
}

#[tokio::test]
async fn test_transient_failure_retains_and_retries() {
    let dir = TempDir::new().unwrap();
    let transport = ScriptedTransport::new([UploadOutcome::from_status(500)], UploadOutcome::Success);
    let pipeline = EventPipeline::builder("Segment.io", file_store(&dir), transport.clone()).build();
    pipeline.start().unwrap();

    pipeline.put(Event::track("retry-me")).await;
    pipeline.flush_and_wait(WAIT).await.unwrap();

    let pending = pipeline.storage().pending_batches().unwrap();
    assert_eq!(pending.len(), 1);
    assert!(pending[0].ends_with("wk-0.json"));
    assert_eq!(pipeline.metrics().batches_retained, 1);

    // Next cycle uploads the same bytes and deletes the file
    pipeline.flush_and_wait(WAIT).await.unwrap();

    let received = transport.received();
    assert_eq!(received.len(), 2);
    assert_eq!(received[0], received[1]);
    assert!(pipeline.storage().pending_batches().unwrap().is_empty());
    assert_eq!(pipeline.metrics().batches_uploaded, 1);
}

#[tokio::test]
async fn test_uploaded_batch_is_wire_format() {
    let dir = TempDir::new().unwrap();
    let transport = ScriptedTransport::accepting();
    let pipeline = EventPipeline::builder("Segment.io", file_store(&dir), transport.clone()).build();
    pipeline.start().unwrap();

    pipeline.put(Event::track("first")).await;
    pipeline.put(Event::track("second")).await;
    pipeline.flush_and_wait(WAIT).await.unwrap();

    let body = String::from_utf8(transport.received()[0].to_vec()).unwrap();
    assert!(body.starts_with(r#"{"batch":[{"#));
    assert!(body.ends_with(r#"","writeKey":"wk"}"#));

    let v: serde_json::Value = serde_json::from_str(&body).unwrap();
    let batch = v["batch"].as_array().unwrap();
    assert_eq!(batch[0]["event"], "first");
    assert_eq!(batch[1]["event"], "second");
    assert!(v["sentAt"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_startup_policy_flushes_first_event() {
    let dir = TempDir::new().unwrap();
    let transport = ScriptedTransport::accepting();
    let pipeline = EventPipeline::builder("Segment.io", file_store(&dir), transport.clone())
        .policy(Arc::new(StartupPolicy::new()))
        .policy(Arc::new(CountPolicy::new(100)))
        .build();
    pipeline.start().unwrap();

    pipeline.put(Event::track("hello")).await;
    eventually(|| pipeline.metrics().batches_uploaded == 1).await;

    // Restarting does not re-arm the startup policy
    pipeline.stop();
    pipeline.start().unwrap();
    pipeline.put(Event::track("again")).await;
    eventually(|| pipeline.metrics().events_written == 2).await;
    assert_eq!(pipeline.metrics().flushes_requested, 1);
}

#[tokio::test]
async fn test_frequency_policy_drives_uploads() {
    let dir = TempDir::new().unwrap();
    let transport = ScriptedTransport::accepting();
    let pipeline = EventPipeline::builder("Segment.io", file_store(&dir), transport.clone())
        .policy(Arc::new(FrequencyPolicy::new(Duration::from_millis(50))))
        .build();
    pipeline.start().unwrap();

    pipeline.put(Event::track("tick")).await;
    eventually(|| pipeline.metrics().batches_uploaded == 1).await;

    pipeline.stop();
}

#[tokio::test]
async fn test_batches_left_by_previous_run_are_uploaded() {
    let dir = TempDir::new().unwrap();

    {
        let storage = file_store(&dir);
        storage
            .write(beacon_storage::StorageKey::Events, r#"{"type":"track","event":"old"}"#)
            .unwrap();
        storage.rollover().unwrap();
        storage.prefs().sync().unwrap();
    }

    let transport = ScriptedTransport::accepting();
    let pipeline = EventPipeline::builder("Segment.io", file_store(&dir), transport.clone()).build();
    pipeline.start().unwrap();
    pipeline.flush_and_wait(WAIT).await.unwrap();

    assert_eq!(transport.event_count(), 1);
    assert!(pipeline.storage().pending_batches().unwrap().is_empty());
}

#[tokio::test]
async fn test_stop_drops_pending_and_restart_uses_fresh_channels() {
    let dir = TempDir::new().unwrap();
    let transport = ScriptedTransport::accepting();
    let pipeline = EventPipeline::builder("Segment.io", file_store(&dir), transport.clone()).build();

    pipeline.start().unwrap();
    pipeline.stop();

    pipeline.put(Event::track("while-stopped")).await;
    assert!(pipeline.flush_and_wait(WAIT).await.is_err());

    pipeline.start().unwrap();
    pipeline.put(Event::track("after-restart")).await;
    pipeline.flush_and_wait(WAIT).await.unwrap();

    assert_eq!(transport.event_count(), 1);
}
