//! Event Pipeline - Buffered batching and upload for one destination
//!
//! # Architecture
//!
//! ```text
//! put(event) ──→ write channel ──→ [Writer] ──→ BatchStore (file-io pool)
//!                     ↑                │
//! flush() ── sentinel ┘                │ policies / sentinel
//!                                      ↓
//!                              upload channel ──→ [Uploader] ──→ Transport
//!                                                 (network-io)     │
//!                                          delete / keep batch ←───┘
//! ```
//!
//! - **Writer**: one item at a time, so writes to the open batch are never
//!   interleaved and land in `put` order
//! - **Uploader**: rollover, then every finalized batch oldest first;
//!   success and permanent failure delete, transient failure keeps
//! - **Restartable**: every `start` creates fresh channels; `stop` cancels
//!   both tasks and drops anything still queued

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use beacon_protocol::Event;
use beacon_storage::{BatchStore, StorageKey, StorageResult};
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::policy::{FlushPolicy, Flusher};
use crate::{
    PipelineError, PipelineMetrics, PipelineMetricsSnapshot, Result, Transport, UploadOutcome,
    WorkerPools,
};

#[cfg(test)]
#[path = "event_pipeline_test.rs"]
mod tests;

/// Default write channel capacity
pub const DEFAULT_QUEUE_SIZE: usize = 1000;

/// Acknowledgement sent once an upload cycle has run
type Ack = oneshot::Sender<()>;

/// Item on the write channel
enum WriteItem {
    Event(Event),
    /// Force an upload cycle, optionally acknowledging when it ran
    Flush(Option<Ack>),
}

/// Channels and cancellation of the current run
struct Running {
    write_tx: mpsc::Sender<WriteItem>,
    cancel: CancellationToken,
}

struct Inner {
    name: String,
    storage: Arc<BatchStore>,
    transport: Arc<dyn Transport>,
    policies: Vec<Arc<dyn FlushPolicy>>,
    pools: WorkerPools,
    queue_size: usize,
    metrics: PipelineMetrics,
    run: Mutex<Option<Running>>,
}

/// Producer/consumer engine tying writes, batch storage, flush policies
/// and upload together
///
/// Cheap to clone; clones share the same pipeline.
#[derive(Clone)]
pub struct EventPipeline {
    inner: Arc<Inner>,
}

/// Builder for [`EventPipeline`]
pub struct EventPipelineBuilder {
    name: String,
    storage: Arc<BatchStore>,
    transport: Arc<dyn Transport>,
    policies: Vec<Arc<dyn FlushPolicy>>,
    pools: Option<WorkerPools>,
    queue_size: usize,
}

impl EventPipelineBuilder {
    /// Set the flush policies (none by default)
    pub fn policies(mut self, policies: Vec<Arc<dyn FlushPolicy>>) -> Self {
        self.policies = policies;
        self
    }

    /// Add one flush policy
    pub fn policy(mut self, policy: Arc<dyn FlushPolicy>) -> Self {
        self.policies.push(policy);
        self
    }

    /// Share worker pools with other pipelines
    pub fn pools(mut self, pools: WorkerPools) -> Self {
        self.pools = Some(pools);
        self
    }

    /// Write channel capacity (zero is treated as one)
    pub fn queue_size(mut self, size: usize) -> Self {
        self.queue_size = size.max(1);
        self
    }

    pub fn build(self) -> EventPipeline {
        EventPipeline {
            inner: Arc::new(Inner {
                name: self.name,
                storage: self.storage,
                transport: self.transport,
                policies: self.policies,
                pools: self.pools.unwrap_or_default(),
                queue_size: self.queue_size,
                metrics: PipelineMetrics::new(),
                run: Mutex::new(None),
            }),
        }
    }
}

impl EventPipeline {
    /// Start building a pipeline for the destination `name`
    pub fn builder(
        name: impl Into<String>,
        storage: Arc<BatchStore>,
        transport: Arc<dyn Transport>,
    ) -> EventPipelineBuilder {
        EventPipelineBuilder {
            name: name.into(),
            storage,
            transport,
            policies: Vec::new(),
            pools: None,
            queue_size: DEFAULT_QUEUE_SIZE,
        }
    }

    /// Destination name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Batch store backing this pipeline
    pub fn storage(&self) -> &Arc<BatchStore> {
        &self.inner.storage
    }

    /// Whether the pipeline is running
    pub fn is_running(&self) -> bool {
        self.inner.run.lock().is_some()
    }

    /// Current metrics
    pub fn metrics(&self) -> PipelineMetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Start the writer and uploader tasks
    ///
    /// Idempotent while running. Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<()> {
        let mut run = self.inner.run.lock();
        if run.is_some() {
            return Ok(());
        }

        let handle = tokio::runtime::Handle::try_current()
            .map_err(|_| PipelineError::worker("no tokio runtime"))?;

        let (write_tx, write_rx) = mpsc::channel(self.inner.queue_size);
        let (upload_tx, upload_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        handle.spawn(run_writer(
            Arc::clone(&self.inner),
            write_rx,
            upload_tx,
            cancel.clone(),
        ));
        handle.spawn(run_uploader(Arc::clone(&self.inner), upload_rx, cancel.clone()));

        let flusher: Arc<dyn Flusher> = Arc::new(ChannelFlusher {
            write_tx: write_tx.clone(),
        });
        for policy in &self.inner.policies {
            policy.schedule(Arc::clone(&flusher));
        }

        *run = Some(Running { write_tx, cancel });

        tracing::info!(
            pipeline = %self.inner.name,
            write_key = %self.inner.storage.write_key(),
            policies = ?self.inner.policies.iter().map(|p| p.name()).collect::<Vec<_>>(),
            "pipeline started"
        );
        Ok(())
    }

    /// Cancel both tasks and unschedule every policy
    ///
    /// Events queued but not yet written are dropped.
    pub fn stop(&self) {
        let Some(running) = self.inner.run.lock().take() else {
            return;
        };

        running.cancel.cancel();
        for policy in &self.inner.policies {
            policy.unschedule();
        }

        let s = self.inner.metrics.snapshot();
        tracing::info!(
            pipeline = %self.inner.name,
            events_written = s.events_written,
            batches_uploaded = s.batches_uploaded,
            "pipeline stopped"
        );
    }

    /// Queue an event for writing
    ///
    /// Waits only if the write channel is full. Dropped if the pipeline is
    /// not running.
    pub async fn put(&self, event: Event) {
        if self.send(WriteItem::Event(event)).await {
            self.inner.metrics.record_enqueued();
        }
    }

    /// Request an upload cycle without waiting for it
    pub async fn flush(&self) {
        self.send(WriteItem::Flush(None)).await;
    }

    /// Request an upload cycle and wait until it has run
    ///
    /// Completion means the cycle ran, not that every upload succeeded.
    pub async fn flush_and_wait(&self, timeout: Duration) -> Result<()> {
        let write_tx = self
            .sender()
            .ok_or_else(|| PipelineError::not_running(self.inner.name.as_str()))?;
        let (ack_tx, ack_rx) = oneshot::channel();

        let cycle = async move {
            write_tx
                .send(WriteItem::Flush(Some(ack_tx)))
                .await
                .map_err(|_| PipelineError::FlushCancelled)?;
            ack_rx.await.map_err(|_| PipelineError::FlushCancelled)
        };

        match tokio::time::timeout(timeout, cycle).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(pipeline = %self.inner.name, ?timeout, "flush timed out");
                Err(PipelineError::FlushTimeout(timeout))
            }
        }
    }

    fn sender(&self) -> Option<mpsc::Sender<WriteItem>> {
        self.inner.run.lock().as_ref().map(|r| r.write_tx.clone())
    }

    /// Returns whether the item was queued
    async fn send(&self, item: WriteItem) -> bool {
        let Some(write_tx) = self.sender() else {
            tracing::debug!(pipeline = %self.inner.name, "pipeline not running, item dropped");
            return false;
        };
        write_tx.send(item).await.is_ok()
    }
}

#[async_trait]
impl Flusher for EventPipeline {
    async fn flush(&self) {
        EventPipeline::flush(self).await;
    }
}

impl std::fmt::Debug for EventPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPipeline")
            .field("name", &self.inner.name)
            .field("running", &self.is_running())
            .field("policies", &self.inner.policies.len())
            .finish()
    }
}

/// Flusher handed to timer policies; bound to one run's write channel
struct ChannelFlusher {
    write_tx: mpsc::Sender<WriteItem>,
}

#[async_trait]
impl Flusher for ChannelFlusher {
    async fn flush(&self) {
        let _ = self.write_tx.send(WriteItem::Flush(None)).await;
    }
}

async fn run_writer(
    inner: Arc<Inner>,
    mut write_rx: mpsc::Receiver<WriteItem>,
    upload_tx: mpsc::UnboundedSender<Option<Ack>>,
    cancel: CancellationToken,
) {
    tracing::debug!(pipeline = %inner.name, "writer starting");

    loop {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            item = write_rx.recv() => match item {
                Some(item) => item,
                None => break,
            },
        };

        let (forced, ack) = match item {
            WriteItem::Flush(ack) => (true, ack),
            WriteItem::Event(event) => {
                inner.write_event(&event).await;
                for policy in &inner.policies {
                    policy.update_state(&event);
                }
                (false, None)
            }
        };

        if forced || inner.policies.iter().any(|p| p.should_flush()) {
            inner.metrics.record_flush_requested();
            if upload_tx.send(ack).is_err() {
                break;
            }
            for policy in &inner.policies {
                policy.reset();
            }
        }
    }

    tracing::debug!(pipeline = %inner.name, "writer stopped");
}

async fn run_uploader(
    inner: Arc<Inner>,
    mut upload_rx: mpsc::UnboundedReceiver<Option<Ack>>,
    cancel: CancellationToken,
) {
    tracing::debug!(pipeline = %inner.name, "uploader starting");

    loop {
        let ack = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            signal = upload_rx.recv() => match signal {
                Some(ack) => ack,
                None => break,
            },
        };

        match inner.pools.network_io().await {
            Ok(_permit) => inner.upload_cycle().await,
            Err(e) => tracing::error!(pipeline = %inner.name, error = %e, "upload skipped"),
        }

        if let Some(ack) = ack {
            let _ = ack.send(());
        }
    }

    tracing::debug!(pipeline = %inner.name, "uploader stopped");
}

impl Inner {
    /// Run a storage operation on the file-io pool
    async fn with_storage<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&BatchStore) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        Ok(self.pools.file_io(move || f(&storage)).await??)
    }

    async fn write_event(&self, event: &Event) {
        let json = match event.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(pipeline = %self.name, error = %e, "event not serializable, dropped");
                self.metrics.record_rejected();
                return;
            }
        };

        match self
            .with_storage(move |s| s.write(StorageKey::Events, &json))
            .await
        {
            Ok(()) => self.metrics.record_written(),
            Err(PipelineError::Storage(e)) if e.is_admission() => {
                tracing::warn!(pipeline = %self.name, error = %e, "event rejected");
                self.metrics.record_rejected();
            }
            Err(e) => {
                tracing::error!(pipeline = %self.name, error = %e, "failed to store event");
                self.metrics.record_rejected();
            }
        }
    }

    async fn upload_cycle(&self) {
        self.metrics.record_cycle();

        if let Err(e) = self.with_storage(|s| s.rollover()).await {
            tracing::error!(pipeline = %self.name, error = %e, "rollover failed");
        }

        let batches = match self.with_storage(|s| s.pending_batches()).await {
            Ok(batches) => batches,
            Err(e) => {
                tracing::error!(pipeline = %self.name, error = %e, "failed to list batches");
                return;
            }
        };

        if !batches.is_empty() {
            tracing::debug!(pipeline = %self.name, count = batches.len(), "uploading batches");
        }

        for id in batches {
            self.upload_batch(id).await;
        }
    }

    async fn upload_batch(&self, id: String) {
        let read_id = id.clone();
        let bytes = match self.with_storage(move |s| s.read_as_bytes(&read_id)).await {
            Ok(Some(bytes)) if !bytes.is_empty() => bytes,
            Ok(_) => {
                tracing::debug!(pipeline = %self.name, file = %id, "batch empty or missing, skipped");
                return;
            }
            Err(e) => {
                tracing::warn!(pipeline = %self.name, file = %id, error = %e, "failed to read batch");
                return;
            }
        };

        let len = bytes.len() as u64;
        let outcome = self.transport.upload(Bytes::from(bytes)).await;

        match outcome {
            UploadOutcome::Success => self.metrics.record_uploaded(len),
            UploadOutcome::PermanentFailure => {
                tracing::warn!(pipeline = %self.name, file = %id, "batch rejected by collector, discarding");
                self.metrics.record_discarded();
            }
            UploadOutcome::TransientFailure => {
                tracing::debug!(pipeline = %self.name, file = %id, "batch kept for retry");
                self.metrics.record_retained();
            }
        }

        if outcome.deletes_batch() {
            let remove_id = id.clone();
            if let Err(e) = self.with_storage(move |s| s.remove_file(&remove_id)).await {
                tracing::error!(pipeline = %self.name, file = %id, error = %e, "failed to delete batch");
            }
        }
    }
}
