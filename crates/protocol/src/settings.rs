//! Remote settings snapshot
//!
//! Settings are fetched from the CDN, cached in the preference store and
//! handed to plugins as immutable snapshots.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Settings snapshot for a write key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Destination key -> destination settings
    pub integrations: Map<String, Value>,

    /// Tracking plan
    pub plan: Map<String, Value>,

    /// Edge function configuration
    pub edge_function: Map<String, Value>,

    /// Middleware configuration
    pub middleware_settings: Map<String, Value>,
}

impl Settings {
    /// Settings that enable exactly the given destinations
    pub fn with_integrations<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let integrations = keys
            .into_iter()
            .map(|k| (k.into(), Value::Object(Map::new())))
            .collect();
        Self {
            integrations,
            ..Self::default()
        }
    }

    /// Whether the destination with this key is present
    #[inline]
    pub fn has_integration(&self, key: &str) -> bool {
        self.integrations.contains_key(key)
    }

    /// Settings object of one destination
    pub fn integration(&self, key: &str) -> Option<&Map<String, Value>> {
        self.integrations.get(key).and_then(Value::as_object)
    }

    /// Parse cached settings, falling back to defaults on malformed input
    pub fn from_json_or_default(s: &str) -> Self {
        serde_json::from_str(s).unwrap_or_default()
    }

    /// Serialize for caching
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
