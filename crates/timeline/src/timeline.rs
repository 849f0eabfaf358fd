//! Timeline - Stage sequencing over a set of mediators

use std::sync::Arc;

use beacon_protocol::{Event, Settings};
use parking_lot::RwLock;

use crate::mediator::{Entry, Mediator};
use crate::{Diagnostics, NoopDiagnostics, Plugin, PluginKind, UpdateType};

#[cfg(test)]
#[path = "timeline_test.rs"]
mod tests;

/// Owns one mediator per stage and the last settings snapshot
pub struct Timeline {
    before: Mediator,
    enrichment: Mediator,
    destination: Mediator,
    after: Mediator,
    utility: Mediator,

    /// Replayed to plugins added later as an `Initial` update
    settings: RwLock<Option<Settings>>,

    diagnostics: Arc<dyn Diagnostics>,
}

impl Timeline {
    /// Create an empty timeline that discards plugin failures
    pub fn new() -> Self {
        Self::with_diagnostics(Arc::new(NoopDiagnostics))
    }

    /// Create an empty timeline reporting plugin failures to `diagnostics`
    pub fn with_diagnostics(diagnostics: Arc<dyn Diagnostics>) -> Self {
        Self {
            before: Mediator::new(PluginKind::Before),
            enrichment: Mediator::new(PluginKind::Enrichment),
            destination: Mediator::new(PluginKind::Destination),
            after: Mediator::new(PluginKind::After),
            utility: Mediator::new(PluginKind::Utility),
            settings: RwLock::new(None),
            diagnostics,
        }
    }

    /// Mediator for a stage
    pub fn mediator(&self, kind: PluginKind) -> &Mediator {
        match kind {
            PluginKind::Before => &self.before,
            PluginKind::Enrichment => &self.enrichment,
            PluginKind::Destination => &self.destination,
            PluginKind::After => &self.after,
            PluginKind::Utility => &self.utility,
        }
    }

    fn mediators(&self) -> [&Mediator; 5] {
        PluginKind::ORDER.map(|kind| self.mediator(kind))
    }

    /// Run an event through Before, Enrichment, Destination and After
    ///
    /// Destinations each receive a copy of the Enrichment output. The
    /// returned event is the After output, or `None` if a Before or
    /// Enrichment plugin dropped it.
    pub async fn process(&self, event: Event) -> Option<Event> {
        let diagnostics = self.diagnostics.as_ref();

        let event = self.before.execute(event, diagnostics).await?;
        let event = self.enrichment.execute(event, diagnostics).await?;

        self.destination.execute_each(&event, diagnostics).await;

        self.after.execute(event, diagnostics).await
    }

    /// Register a plugin in its stage
    ///
    /// If settings were already applied, the plugin receives them once as
    /// an `Initial` update.
    pub fn add<P: Plugin>(&self, plugin: Arc<P>) {
        let kind = plugin.kind();
        tracing::debug!(plugin = %plugin.name(), stage = kind.as_str(), "adding plugin");

        self.mediator(kind).add(Entry::new(plugin.clone()));

        let settings = self.settings.read().clone();
        if let Some(settings) = settings {
            plugin.update(&settings, UpdateType::Initial);
        }
    }

    /// Remove a plugin from every stage and shut it down
    ///
    /// Returns `false` if the plugin was not registered.
    pub fn remove<P: Plugin>(&self, plugin: &Arc<P>) -> bool {
        let addr = Arc::as_ptr(plugin) as *const ();

        let mut removed = false;
        for mediator in self.mediators() {
            removed |= mediator.remove(addr);
        }

        if removed {
            tracing::debug!(plugin = %plugin.name(), "removed plugin");
            plugin.shutdown();
        }
        removed
    }

    /// Remove every plugin, shutting each down
    pub fn clear(&self) {
        for mediator in self.mediators() {
            for entry in mediator.drain() {
                entry.plugin.shutdown();
            }
        }
    }

    /// First registered plugin of type `T`
    ///
    /// Stages are searched in order Before, Enrichment, Destination, After,
    /// Utility; within a stage in registration order.
    pub fn find<T: Plugin>(&self) -> Option<Arc<T>> {
        self.mediators()
            .into_iter()
            .flat_map(|m| m.snapshot())
            .find_map(|e| e.any.downcast::<T>().ok())
    }

    /// Every registered plugin of type `T`, in lookup order
    pub fn find_all<T: Plugin>(&self) -> Vec<Arc<T>> {
        self.mediators()
            .into_iter()
            .flat_map(|m| m.snapshot())
            .filter_map(|e| e.any.downcast::<T>().ok())
            .collect()
    }

    /// Store a settings snapshot and deliver it to every plugin as a `Refresh`
    pub fn update_settings(&self, settings: Settings) {
        *self.settings.write() = Some(settings.clone());

        for mediator in self.mediators() {
            mediator.update(&settings, UpdateType::Refresh);
        }
    }

    /// Last applied settings
    pub fn settings(&self) -> Option<Settings> {
        self.settings.read().clone()
    }

    /// Apply a closure to every plugin in lookup order
    pub fn apply_closure(&self, mut f: impl FnMut(&dyn Plugin)) {
        for mediator in self.mediators() {
            mediator.apply(&mut f);
        }
    }

    /// Total registered plugins
    pub fn len(&self) -> usize {
        self.mediators().iter().map(|m| m.len()).sum()
    }

    /// Check if no plugins are registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Timeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timeline")
            .field("before", &self.before)
            .field("enrichment", &self.enrichment)
            .field("destination", &self.destination)
            .field("after", &self.after)
            .field("utility", &self.utility)
            .finish()
    }
}
