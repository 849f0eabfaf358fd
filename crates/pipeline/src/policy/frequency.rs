//! Interval-driven flushing

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

use super::{FlushPolicy, Flusher};

#[cfg(test)]
#[path = "frequency_test.rs"]
mod tests;

/// Calls the pipeline's flusher every `interval` while scheduled
///
/// `should_flush` is always `false`; the timer drives flushing directly.
#[derive(Debug)]
pub struct FrequencyPolicy {
    interval: Duration,
    timer: Mutex<Option<CancellationToken>>,
}

impl FrequencyPolicy {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            timer: Mutex::new(None),
        }
    }

    /// Flush period
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether a timer is currently running
    pub fn is_scheduled(&self) -> bool {
        self.timer.lock().is_some()
    }
}

impl FlushPolicy for FrequencyPolicy {
    fn name(&self) -> &'static str {
        "frequency"
    }

    fn should_flush(&self) -> bool {
        false
    }

    fn schedule(&self, flusher: Arc<dyn Flusher>) {
        let mut timer = self.timer.lock();
        if timer.is_some() {
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no tokio runtime, frequency flush not scheduled");
            return;
        };

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let period = self.interval;

        handle.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => flusher.flush().await,
                }
            }

            tracing::trace!("frequency flush timer stopped");
        });

        *timer = Some(cancel);
    }

    fn unschedule(&self) {
        if let Some(cancel) = self.timer.lock().take() {
            cancel.cancel();
        }
    }
}

impl Drop for FrequencyPolicy {
    fn drop(&mut self) {
        self.unschedule();
    }
}
