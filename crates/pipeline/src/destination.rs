//! Collector destination
//!
//! The Destination-stage plugin that owns an [`EventPipeline`] and forwards
//! every event enabled for the collector into it.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use beacon_protocol::{COLLECTOR_INTEGRATION_KEY, Event, Settings};
use beacon_timeline::{Plugin, PluginKind, PluginResult, UpdateType};

use crate::EventPipeline;

#[cfg(test)]
#[path = "destination_test.rs"]
mod tests;

/// Destination plugin delivering events to the collector
#[derive(Debug)]
pub struct CollectorDestination {
    key: String,
    pipeline: EventPipeline,
    enabled: AtomicBool,
}

impl CollectorDestination {
    /// Create the destination; `enabled` applies until settings arrive
    pub fn new(pipeline: EventPipeline, enabled: bool) -> Self {
        Self {
            key: COLLECTOR_INTEGRATION_KEY.to_string(),
            pipeline,
            enabled: AtomicBool::new(enabled),
        }
    }

    /// Integration key matched against settings and event integrations
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Pipeline owned by this destination
    pub fn pipeline(&self) -> &EventPipeline {
        &self.pipeline
    }

    /// Whether the destination currently accepts events
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Plugin for CollectorDestination {
    fn kind(&self) -> PluginKind {
        PluginKind::Destination
    }

    fn name(&self) -> &str {
        &self.key
    }

    async fn execute(&self, event: Event) -> PluginResult<Option<Event>> {
        if self.is_enabled() && event.integration_enabled(&self.key) {
            self.pipeline.put(event.clone()).await;
        }
        Ok(Some(event))
    }

    fn update(&self, settings: &Settings, update: UpdateType) {
        let enabled = settings.has_integration(&self.key);
        let was = self.enabled.swap(enabled, Ordering::AcqRel);

        if enabled != was {
            tracing::info!(destination = %self.key, enabled, ?update, "destination toggled");
        }

        if enabled {
            if let Err(e) = self.pipeline.start() {
                tracing::error!(destination = %self.key, error = %e, "failed to start pipeline");
            }
        } else {
            self.pipeline.stop();
        }
    }

    fn shutdown(&self) {
        self.pipeline.stop();
    }
}
