//! Beacon - Timeline
//!
//! Staged plugin execution over a single event.
//!
//! # Overview
//!
//! Every event runs through four stages in a fixed order. Each stage is a
//! [`Mediator`]: an ordered list of plugins of one [`PluginKind`].
//!
//! ```text
//! [Event] → Before → Enrichment ─┬→ Destination (each on its own copy, outputs ignored)
//!                                └→ After → [Event']
//! ```
//!
//! - A plugin returning `None` drops the event; later stages do not run.
//! - A plugin returning an error is reported to the [`Diagnostics`] sink and
//!   the event continues unchanged (fail-open).
//! - Utility plugins never see events; they only receive settings updates.
//!
//! # Adding a Plugin
//!
//! ```ignore
//! struct Stamp;
//!
//! #[async_trait]
//! impl Plugin for Stamp {
//!     fn kind(&self) -> PluginKind { PluginKind::Enrichment }
//!     fn name(&self) -> &str { "stamp" }
//!
//!     async fn execute(&self, mut event: Event) -> PluginResult<Option<Event>> {
//!         match event.event_type {
//!             EventType::Track => { event.context.insert("stamped".into(), true.into()); }
//!             _ => {}
//!         }
//!         Ok(Some(event))
//!     }
//! }
//!
//! timeline.add(Arc::new(Stamp));
//! ```
//!
//! # Modules
//!
//! - `mediator` - Ordered execution within one stage
//! - `timeline` - Stage sequencing, lookup and settings fan-out
//! - `diagnostics` - Sinks for plugin failures
//! - `state` - Immutable snapshot store with subscribers
//! - `plugins` - Built-in Before-stage plugins

mod diagnostics;
mod error;
mod mediator;
pub mod plugins;
mod state;
mod timeline;

use async_trait::async_trait;
use beacon_protocol::{Event, Settings};

pub use diagnostics::{Diagnostics, NoopDiagnostics, TracingDiagnostics};
pub use error::PluginError;
pub use mediator::Mediator;
pub use plugins::{ContextPlugin, IdentityPlugin, UserInfo};
pub use state::StateStore;
pub use timeline::Timeline;

/// Result type for plugin operations
pub type PluginResult<T> = Result<T, PluginError>;

/// Stage a plugin belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginKind {
    /// Runs first; identity and context decoration
    Before,
    /// Runs second; general enrichment
    Enrichment,
    /// Side-effect sinks (each owns its delivery)
    Destination,
    /// Runs last on the enrichment output
    After,
    /// Never executed on events
    Utility,
}

impl PluginKind {
    /// Lookup order across stages
    pub const ORDER: [PluginKind; 5] = [
        PluginKind::Before,
        PluginKind::Enrichment,
        PluginKind::Destination,
        PluginKind::After,
        PluginKind::Utility,
    ];

    /// Name for logging
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::Enrichment => "enrichment",
            Self::Destination => "destination",
            Self::After => "after",
            Self::Utility => "utility",
        }
    }
}

/// Why a settings update is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateType {
    /// First delivery to a freshly added plugin
    Initial,
    /// Settings changed after the plugin was added
    Refresh,
}

/// A timeline plugin
///
/// Event-type specific behavior is a `match` on `event.event_type` inside
/// `execute`.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// Stage this plugin runs in
    fn kind(&self) -> PluginKind;

    /// Name for logging and diagnostics
    fn name(&self) -> &str;

    /// Process one event
    ///
    /// Return `Ok(None)` to drop the event. Errors are reported and the
    /// event continues unchanged.
    async fn execute(&self, event: Event) -> PluginResult<Option<Event>> {
        Ok(Some(event))
    }

    /// Receive a settings snapshot
    fn update(&self, _settings: &Settings, _update: UpdateType) {}

    /// Release resources; called when the plugin is removed
    fn shutdown(&self) {}
}
