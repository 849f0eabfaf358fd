//! Diagnostic sinks for plugin failures

use crate::{PluginError, PluginKind};

/// Receives plugin failures caught by the timeline
pub trait Diagnostics: Send + Sync {
    /// A plugin raised an error; the event continued unchanged
    fn plugin_error(&self, plugin: &str, kind: PluginKind, error: &PluginError);
}

/// Discards every report
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDiagnostics;

impl Diagnostics for NoopDiagnostics {
    fn plugin_error(&self, _plugin: &str, _kind: PluginKind, _error: &PluginError) {}
}

/// Forwards reports to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn plugin_error(&self, plugin: &str, kind: PluginKind, error: &PluginError) {
        tracing::warn!(
            plugin = %plugin,
            stage = kind.as_str(),
            error = %error,
            "plugin failed, event continues unchanged"
        );
    }
}
