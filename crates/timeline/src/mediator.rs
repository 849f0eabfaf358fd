//! Mediator - Ordered plugin execution within one stage
//!
//! # Design
//!
//! - **Sequential execution**: plugins run in registration order, each
//!   receiving the output of the previous
//! - **Drop on `None`**: the first plugin returning `None` stops the stage
//! - **Fail-open**: an error is reported and the input event is passed on
//! - **Snapshot iteration**: the plugin list is copied before awaiting, so
//!   plugins may be added or removed while an event is in flight

use std::any::Any;
use std::sync::Arc;

use beacon_protocol::{Event, Settings};
use parking_lot::RwLock;

use crate::{Diagnostics, Plugin, PluginKind, UpdateType};

#[cfg(test)]
#[path = "mediator_test.rs"]
mod tests;

/// A registered plugin, kept both as a trait object and as `Any` for lookup
#[derive(Clone)]
pub(crate) struct Entry {
    pub(crate) plugin: Arc<dyn Plugin>,
    pub(crate) any: Arc<dyn Any + Send + Sync>,
}

impl Entry {
    pub(crate) fn new<P: Plugin>(plugin: Arc<P>) -> Self {
        Self {
            plugin: plugin.clone(),
            any: plugin,
        }
    }

    /// Address of the plugin allocation, used for identity comparison
    pub(crate) fn addr(&self) -> *const () {
        Arc::as_ptr(&self.plugin) as *const ()
    }
}

/// Ordered list of plugins for a single stage
pub struct Mediator {
    kind: PluginKind,
    plugins: RwLock<Vec<Entry>>,
}

impl Mediator {
    /// Create an empty mediator for a stage
    pub fn new(kind: PluginKind) -> Self {
        Self {
            kind,
            plugins: RwLock::new(Vec::new()),
        }
    }

    /// Stage this mediator runs
    #[inline]
    pub fn kind(&self) -> PluginKind {
        self.kind
    }

    /// Number of registered plugins
    #[inline]
    pub fn len(&self) -> usize {
        self.plugins.read().len()
    }

    /// Check if no plugins are registered
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.plugins.read().is_empty()
    }

    /// Names of registered plugins, in execution order
    pub fn names(&self) -> Vec<String> {
        self.plugins
            .read()
            .iter()
            .map(|e| e.plugin.name().to_string())
            .collect()
    }

    pub(crate) fn add(&self, entry: Entry) {
        self.plugins.write().push(entry);
    }

    /// Remove every registration of the plugin at `addr`
    pub(crate) fn remove(&self, addr: *const ()) -> bool {
        let mut plugins = self.plugins.write();
        let before = plugins.len();
        plugins.retain(|e| e.addr() != addr);
        plugins.len() != before
    }

    pub(crate) fn snapshot(&self) -> Vec<Entry> {
        self.plugins.read().clone()
    }

    pub(crate) fn drain(&self) -> Vec<Entry> {
        std::mem::take(&mut *self.plugins.write())
    }

    /// Run the event through every plugin in order
    ///
    /// Returns `None` when a plugin dropped the event.
    pub async fn execute(&self, event: Event, diagnostics: &dyn Diagnostics) -> Option<Event> {
        let plugins = self.snapshot();
        let mut current = event;

        for entry in &plugins {
            match entry.plugin.execute(current.clone()).await {
                Ok(Some(next)) => current = next,
                Ok(None) => {
                    tracing::trace!(
                        plugin = %entry.plugin.name(),
                        stage = self.kind.as_str(),
                        "event dropped"
                    );
                    return None;
                }
                Err(e) => diagnostics.plugin_error(entry.plugin.name(), self.kind, &e),
            }
        }

        Some(current)
    }

    /// Hand each plugin its own copy of the event, ignoring the outputs
    pub async fn execute_each(&self, event: &Event, diagnostics: &dyn Diagnostics) {
        for entry in &self.snapshot() {
            if let Err(e) = entry.plugin.execute(event.clone()).await {
                diagnostics.plugin_error(entry.plugin.name(), self.kind, &e);
            }
        }
    }

    /// Deliver a settings snapshot to every plugin
    pub fn update(&self, settings: &Settings, update: UpdateType) {
        for entry in &self.snapshot() {
            entry.plugin.update(settings, update);
        }
    }

    /// Apply a closure to every plugin
    pub fn apply(&self, f: &mut dyn FnMut(&dyn Plugin)) {
        for entry in &self.snapshot() {
            f(entry.plugin.as_ref());
        }
    }
}

impl std::fmt::Debug for Mediator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mediator")
            .field("kind", &self.kind)
            .field("plugins", &self.names())
            .finish()
    }
}
