//! Context decoration
//!
//! Stamps library info, the instance id, a message id and a timestamp on
//! every event that lacks them.

use async_trait::async_trait;
use beacon_protocol::{Event, iso8601_now};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{Plugin, PluginKind, PluginResult};

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;

/// Library name reported in `context.library`
pub const LIBRARY_NAME: &str = "beacon";

/// Before-stage plugin filling in event context
#[derive(Debug)]
pub struct ContextPlugin {
    instance_id: String,
    library: Value,
}

impl ContextPlugin {
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
            library: json!({
                "name": LIBRARY_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            }),
        }
    }

    /// Id shared by every event from this client instance
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }
}

impl Default for ContextPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for ContextPlugin {
    fn kind(&self) -> PluginKind {
        PluginKind::Before
    }

    fn name(&self) -> &str {
        "context"
    }

    async fn execute(&self, mut event: Event) -> PluginResult<Option<Event>> {
        event
            .context
            .entry("library")
            .or_insert_with(|| self.library.clone());
        event
            .context
            .entry("instanceId")
            .or_insert_with(|| Value::String(self.instance_id.clone()));

        event.assign_message_id(Uuid::new_v4().to_string());

        if event.timestamp.is_none() {
            event.timestamp = Some(iso8601_now());
        }

        Ok(Some(event))
    }
}
