//! Pipeline metrics
//!
//! Atomic counters for the writer and uploader tasks.
//! All operations use relaxed ordering; values are eventually consistent.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one event pipeline
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    /// Events accepted onto the write channel
    events_enqueued: AtomicU64,

    /// Events appended to a batch file
    events_written: AtomicU64,

    /// Events lost to serialization or storage errors
    events_rejected: AtomicU64,

    /// Upload signals raised by the writer
    flushes_requested: AtomicU64,

    /// Upload cycles completed
    upload_cycles: AtomicU64,

    /// Batches acknowledged by the collector and deleted
    batches_uploaded: AtomicU64,

    /// Batches kept for the next cycle after a transient failure
    batches_retained: AtomicU64,

    /// Batches deleted after a permanent failure
    batches_discarded: AtomicU64,

    /// Bytes of successfully uploaded batches
    bytes_uploaded: AtomicU64,
}

impl PipelineMetrics {
    /// Create new metrics instance with all counters at zero
    #[inline]
    pub const fn new() -> Self {
        Self {
            events_enqueued: AtomicU64::new(0),
            events_written: AtomicU64::new(0),
            events_rejected: AtomicU64::new(0),
            flushes_requested: AtomicU64::new(0),
            upload_cycles: AtomicU64::new(0),
            batches_uploaded: AtomicU64::new(0),
            batches_retained: AtomicU64::new(0),
            batches_discarded: AtomicU64::new(0),
            bytes_uploaded: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_enqueued(&self) {
        self.events_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_written(&self) {
        self.events_written.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_rejected(&self) {
        self.events_rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_flush_requested(&self) {
        self.flushes_requested.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_cycle(&self) {
        self.upload_cycles.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a batch accepted by the collector
    #[inline]
    pub fn record_uploaded(&self, bytes: u64) {
        self.batches_uploaded.fetch_add(1, Ordering::Relaxed);
        self.bytes_uploaded.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_retained(&self) {
        self.batches_retained.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_discarded(&self) {
        self.batches_discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters
    #[inline]
    pub fn snapshot(&self) -> PipelineMetricsSnapshot {
        PipelineMetricsSnapshot {
            events_enqueued: self.events_enqueued.load(Ordering::Relaxed),
            events_written: self.events_written.load(Ordering::Relaxed),
            events_rejected: self.events_rejected.load(Ordering::Relaxed),
            flushes_requested: self.flushes_requested.load(Ordering::Relaxed),
            upload_cycles: self.upload_cycles.load(Ordering::Relaxed),
            batches_uploaded: self.batches_uploaded.load(Ordering::Relaxed),
            batches_retained: self.batches_retained.load(Ordering::Relaxed),
            batches_discarded: self.batches_discarded.load(Ordering::Relaxed),
            bytes_uploaded: self.bytes_uploaded.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of pipeline metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineMetricsSnapshot {
    pub events_enqueued: u64,
    pub events_written: u64,
    pub events_rejected: u64,
    pub flushes_requested: u64,
    pub upload_cycles: u64,
    pub batches_uploaded: u64,
    pub batches_retained: u64,
    pub batches_discarded: u64,
    pub bytes_uploaded: u64,
}

impl PipelineMetricsSnapshot {
    /// Batches that left local storage, for any reason
    pub fn batches_deleted(&self) -> u64 {
        self.batches_uploaded + self.batches_discarded
    }
}
