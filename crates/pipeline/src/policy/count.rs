//! Count-based flushing

use std::sync::atomic::{AtomicUsize, Ordering};

use beacon_config::DEFAULT_FLUSH_AT;
use beacon_protocol::Event;

use super::FlushPolicy;

/// Flushes once `flush_at` events were admitted since the last reset
#[derive(Debug)]
pub struct CountPolicy {
    flush_at: usize,
    count: AtomicUsize,
}

impl CountPolicy {
    /// Create a policy; a threshold below one falls back to the default
    pub fn new(flush_at: usize) -> Self {
        let flush_at = if flush_at < 1 {
            DEFAULT_FLUSH_AT
        } else {
            flush_at
        };
        Self {
            flush_at,
            count: AtomicUsize::new(0),
        }
    }

    /// Effective threshold
    pub fn flush_at(&self) -> usize {
        self.flush_at
    }

    /// Events admitted since the last reset
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}

impl Default for CountPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_FLUSH_AT)
    }
}

impl FlushPolicy for CountPolicy {
    fn name(&self) -> &'static str {
        "count"
    }

    fn should_flush(&self) -> bool {
        self.count() >= self.flush_at
    }

    fn update_state(&self, _event: &Event) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
    }
}
