//! Analytics event model
//!
//! An `Event` is created by the public API, decorated by Before-stage
//! plugins and serialized to JSON exactly once when it is admitted to a
//! pipeline. Type-specific fields (`event`, `properties`, `traits`,
//! `name`, `groupId`, `previousId`, ...) live in a flattened payload map so
//! the model stays closed over the event kind.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{ProtocolError, Result};

/// Event classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Track,
    Identify,
    Screen,
    Group,
    Alias,
    Page,
}

impl EventType {
    /// Wire name of this event type
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::Identify => "identify",
            Self::Screen => "screen",
            Self::Group => "group",
            Self::Alias => "alias",
            Self::Page => "page",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single analytics event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Event kind
    #[serde(rename = "type")]
    pub event_type: EventType,

    /// Anonymous device/user identifier
    #[serde(default)]
    pub anonymous_id: String,

    /// Known user identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Unique message id, assigned once
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message_id: Option<String>,

    /// ISO8601 creation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Ambient context (library, device, app, ...)
    #[serde(default)]
    pub context: Map<String, Value>,

    /// Per-destination enablement/settings
    #[serde(default)]
    pub integrations: Map<String, Value>,

    /// Type-specific fields
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Event {
    /// Create an empty event of the given type
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            anonymous_id: String::new(),
            user_id: None,
            message_id: None,
            timestamp: None,
            context: Map::new(),
            integrations: Map::new(),
            payload: Map::new(),
        }
    }

    /// Create a track event
    pub fn track(name: impl Into<String>) -> Self {
        Self::new(EventType::Track).with_field("event", Value::String(name.into()))
    }

    /// Create an identify event
    pub fn identify(user_id: impl Into<String>) -> Self {
        let mut event = Self::new(EventType::Identify);
        event.user_id = Some(user_id.into());
        event
    }

    /// Create a screen event
    pub fn screen(name: impl Into<String>) -> Self {
        Self::new(EventType::Screen).with_field("name", Value::String(name.into()))
    }

    /// Create a page event
    pub fn page(name: impl Into<String>) -> Self {
        Self::new(EventType::Page).with_field("name", Value::String(name.into()))
    }

    /// Create a group event
    pub fn group(group_id: impl Into<String>) -> Self {
        Self::new(EventType::Group).with_field("groupId", Value::String(group_id.into()))
    }

    /// Create an alias event; `previousId` is filled in by identity plugins
    pub fn alias(new_id: impl Into<String>) -> Self {
        let mut event = Self::new(EventType::Alias);
        event.user_id = Some(new_id.into());
        event
    }

    /// Set a type-specific payload field
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    /// Set `properties` (track/screen/page)
    #[must_use]
    pub fn with_properties(self, properties: Map<String, Value>) -> Self {
        self.with_field("properties", Value::Object(properties))
    }

    /// Set `traits` (identify/group)
    #[must_use]
    pub fn with_traits(self, traits: Map<String, Value>) -> Self {
        self.with_field("traits", Value::Object(traits))
    }

    /// Message id, if one has been assigned
    #[inline]
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// Assign the message id
    ///
    /// Returns `false` and leaves the event untouched if an id was already
    /// assigned.
    pub fn assign_message_id(&mut self, id: impl Into<String>) -> bool {
        if self.message_id.is_some() {
            return false;
        }
        self.message_id = Some(id.into());
        true
    }

    /// Traits carried by the payload, if any
    pub fn traits(&self) -> Option<&Map<String, Value>> {
        self.payload.get("traits").and_then(Value::as_object)
    }

    /// Whether the event opts in to the given destination
    ///
    /// Destinations are enabled unless the integrations map sets their key
    /// to `false`, or sets `All` to `false` without naming the key.
    pub fn integration_enabled(&self, key: &str) -> bool {
        match self.integrations.get(key) {
            Some(Value::Bool(enabled)) => *enabled,
            Some(_) => true,
            None => !matches!(self.integrations.get("All"), Some(Value::Bool(false))),
        }
    }

    /// Serialize to the JSON form stored in batch files
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(ProtocolError::from)
    }

    /// Parse an event from JSON
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(ProtocolError::from)
    }
}
