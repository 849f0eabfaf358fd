//! Flush policies
//!
//! A policy decides when a pipeline should upload. Threshold policies answer
//! `should_flush` after each admitted event; timer policies ignore it and
//! instead call the pipeline's [`Flusher`] on their own schedule.
//!
//! Policies hold only their own counters and timers and are shared between
//! the pipeline handle and its writer task, so all methods take `&self`.

mod count;
mod frequency;
mod startup;

use std::sync::Arc;

use async_trait::async_trait;
use beacon_config::PipelineConfig;
use beacon_protocol::Event;

pub use count::CountPolicy;
pub use frequency::FrequencyPolicy;
pub use startup::StartupPolicy;

/// Something that can be asked to flush
#[async_trait]
pub trait Flusher: Send + Sync {
    /// Request an upload cycle without waiting for it
    async fn flush(&self);
}

/// Strategy deciding when a pipeline flushes
pub trait FlushPolicy: Send + Sync {
    /// Name for logging
    fn name(&self) -> &'static str;

    /// Whether the pipeline should flush now
    fn should_flush(&self) -> bool;

    /// Observe an admitted event
    fn update_state(&self, _event: &Event) {}

    /// Called after every flush the writer triggers
    fn reset(&self) {}

    /// Start self-driven flushing; called when the pipeline starts
    fn schedule(&self, _flusher: Arc<dyn Flusher>) {}

    /// Stop self-driven flushing; called when the pipeline stops
    fn unschedule(&self) {}
}

/// Build the configured policy set
///
/// Count is always present; startup and frequency follow the config, with a
/// zero interval disabling the timer.
pub fn from_config(config: &PipelineConfig) -> Vec<Arc<dyn FlushPolicy>> {
    let mut policies: Vec<Arc<dyn FlushPolicy>> = Vec::with_capacity(3);

    if config.flush_on_startup {
        policies.push(Arc::new(StartupPolicy::new()));
    }

    policies.push(Arc::new(CountPolicy::new(config.flush_at)));

    if !config.flush_interval.is_zero() {
        policies.push(Arc::new(FrequencyPolicy::new(config.flush_interval)));
    }

    policies
}
