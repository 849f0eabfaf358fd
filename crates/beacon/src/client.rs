//! Client wiring
//!
//! Builds storage, the plugin timeline and the collector destination from a
//! [`Config`], and drives the settings lifecycle:
//!
//! 1. cached settings (or the configured defaults) are loaded on
//!    construction and applied on start
//! 2. fresh settings are fetched, cached and applied as a refresh
//! 3. shutdown flushes, stops every pipeline and syncs preferences

use std::sync::Arc;

use anyhow::{Context, Result};
use beacon_config::{Config, StorageMedium};
use beacon_pipeline::{
    CollectorDestination, EventPipeline, HttpTransport, PipelineMetricsSnapshot, Transport,
    WorkerPools, policy,
};
use beacon_protocol::{COLLECTOR_INTEGRATION_KEY, Event, Settings, WriteKey};
use beacon_storage::{BatchStore, StorageKey};
use beacon_timeline::{
    ContextPlugin, IdentityPlugin, StateStore, Timeline, TracingDiagnostics,
};
use serde::Serialize;

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;

/// Local state summary
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub write_key: String,
    pub file_index: i64,
    pub pending_batches: Vec<String>,
    pub anonymous_id: String,
    pub user_id: Option<String>,
    pub integrations: Vec<String>,
}

/// An analytics client for one write key
pub struct Client {
    config: Config,
    storage: Arc<BatchStore>,
    transport: Arc<dyn Transport>,
    timeline: Timeline,
    identity: Arc<IdentityPlugin>,
    destination: Arc<CollectorDestination>,
    settings: StateStore<Settings>,
}

impl Client {
    /// Build a client talking to the collector over HTTPS
    pub fn new(config: Config) -> Result<Self> {
        let write_key = WriteKey::new(config.write_key.as_str())?;
        let transport = HttpTransport::new(write_key, &config.upload)
            .context("failed to build http transport")?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Build a client with a custom transport
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        let write_key = WriteKey::new(config.write_key.as_str())?;

        let storage = Arc::new(match config.storage.medium {
            StorageMedium::File => BatchStore::open_file(&config.storage.root, write_key)
                .with_context(|| {
                    format!("failed to open storage under {}", config.storage.root.display())
                })?,
            StorageMedium::Memory => BatchStore::in_memory(write_key),
        });

        let pipeline =
            EventPipeline::builder(COLLECTOR_INTEGRATION_KEY, storage.clone(), transport.clone())
                .policies(policy::from_config(&config.pipeline))
                .pools(WorkerPools::from_config(&config.pipeline))
                .queue_size(config.pipeline.queue_size)
                .build();
        let destination = Arc::new(CollectorDestination::new(pipeline, false));

        let identity = Arc::new(
            IdentityPlugin::load(storage.clone()).context("failed to load identity")?,
        );

        let timeline = Timeline::with_diagnostics(Arc::new(TracingDiagnostics));
        timeline.add(Arc::new(ContextPlugin::new()));
        timeline.add(identity.clone());
        timeline.add(destination.clone());

        let settings = cached_settings(&storage).unwrap_or_else(|| default_settings(&config));

        Ok(Self {
            settings: StateStore::new(settings),
            config,
            storage,
            transport,
            timeline,
            identity,
            destination,
        })
    }

    /// Apply cached settings, then refresh them from the network
    pub async fn start(&self) {
        self.timeline
            .update_settings(self.settings.current().as_ref().clone());

        if let Some(fetched) = self.transport.fetch_settings().await {
            if let Err(e) = self.storage.write(StorageKey::Settings, &fetched.to_json()) {
                tracing::warn!(error = %e, "failed to cache settings");
            }
            self.apply_settings(fetched);
            tracing::debug!("settings refreshed");
        }
    }

    fn apply_settings(&self, settings: Settings) {
        let snapshot = self.settings.dispatch(|_| settings);
        self.timeline.update_settings(snapshot.as_ref().clone());
    }

    /// Run an event through the timeline
    pub async fn process(&self, event: Event) -> Option<Event> {
        self.timeline.process(event).await
    }

    /// Force an upload cycle and wait for it, bounded by `flush_timeout`
    pub async fn flush(&self) -> Result<()> {
        let pipeline = self.destination.pipeline();
        if !pipeline.is_running() {
            tracing::debug!("collector disabled, nothing to flush");
            return Ok(());
        }
        pipeline
            .flush_and_wait(self.config.pipeline.flush_timeout)
            .await
            .context("flush failed")
    }

    /// Flush, stop every pipeline, remove all plugins and sync preferences
    pub async fn shutdown(&self) {
        if let Err(e) = self.flush().await {
            tracing::warn!(error = %e, "final flush incomplete");
        }

        self.timeline.clear();

        if let Err(e) = self.persist() {
            tracing::error!(error = %e, "failed to sync preferences");
        }
        tracing::info!("client shut down");
    }

    /// Write pending preference changes (identity, cursor) to disk
    pub fn persist(&self) -> Result<()> {
        self.storage
            .prefs()
            .sync()
            .context("failed to sync preferences")
    }

    /// Local state summary
    pub fn status(&self) -> Result<Status> {
        let info = self.identity.user_info();
        Ok(Status {
            write_key: self.storage.write_key().to_string(),
            file_index: self.storage.file_index(),
            pending_batches: self.storage.pending_batches()?,
            anonymous_id: info.anonymous_id.clone(),
            user_id: info.user_id.clone(),
            integrations: self.settings.current().integrations.keys().cloned().collect(),
        })
    }

    /// Collector pipeline metrics
    pub fn metrics(&self) -> PipelineMetricsSnapshot {
        self.destination.pipeline().metrics()
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn storage(&self) -> &Arc<BatchStore> {
        &self.storage
    }
}

/// Settings cached by an earlier run; malformed JSON counts as absent
fn cached_settings(storage: &BatchStore) -> Option<Settings> {
    let raw = storage.read(StorageKey::Settings)?;
    match serde_json::from_str::<Settings>(&raw) {
        Ok(settings) => Some(settings),
        Err(e) => {
            tracing::warn!(error = %e, "cached settings malformed, using defaults");
            None
        }
    }
}

/// Settings assumed before any were cached or fetched
fn default_settings(config: &Config) -> Settings {
    Settings::with_integrations(config.upload.default_integrations.iter().cloned())
}
