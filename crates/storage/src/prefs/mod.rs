//! Preference stores
//!
//! Key/value persistence with an in-memory cache as the source of truth for
//! reads. Writes are staged on an [`Editor`] and committed atomically with
//! [`Editor::apply`]; file-backed stores then persist the new snapshot in the
//! background.
//!
//! # Example
//!
//! ```
//! use beacon_storage::{KeyValueStore, MemoryPreferences};
//!
//! let prefs = MemoryPreferences::new();
//! prefs.edit().put_int("a", 1).put_string("b", "x").apply();
//! assert_eq!(prefs.get_int("a", 0), 1);
//! assert_eq!(prefs.get_string("b").as_deref(), Some("x"));
//! ```

mod file;
mod memory;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::StorageResult;

pub use file::FilePreferences;
pub use memory::MemoryPreferences;

/// Scalar preference value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    Int(i64),
    Float(f64),
    String(String),
}

/// Full preference snapshot
pub type PrefMap = BTreeMap<String, PrefValue>;

/// A batch of staged mutations (`None` removes the key)
#[derive(Debug, Default)]
pub struct Changes {
    /// Drop every key before applying `entries`
    pub clear: bool,
    /// Last write wins per key
    pub entries: HashMap<String, Option<PrefValue>>,
}

impl Changes {
    /// Apply to a map, returning whether anything changed
    pub(crate) fn apply_to(self, map: &mut PrefMap) -> bool {
        let mut changed = false;
        if self.clear && !map.is_empty() {
            map.clear();
            changed = true;
        }
        for (key, value) in self.entries {
            match value {
                Some(v) => {
                    if map.get(&key) != Some(&v) {
                        map.insert(key, v);
                        changed = true;
                    }
                }
                None => {
                    if map.remove(&key).is_some() {
                        changed = true;
                    }
                }
            }
        }
        changed
    }
}

/// Key/value preference store
///
/// Implementations must make every committed mutation visible to readers
/// immediately.
pub trait KeyValueStore: Send + Sync {
    /// Raw value for a key
    fn get(&self, key: &str) -> Option<PrefValue>;

    /// Copy of the whole cache
    fn all(&self) -> PrefMap;

    /// Start a batch of mutations
    fn edit(&self) -> Editor<'_>;

    /// Commit staged changes; returns whether the cache changed
    fn commit(&self, changes: Changes) -> bool;

    /// Block until the persisted copy matches the cache
    fn sync(&self) -> StorageResult<()>;

    /// Integer value, or `default` if absent or of another type
    fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.get(key) {
            Some(PrefValue::Int(v)) => v,
            _ => default,
        }
    }

    /// Float value; integers are widened
    fn get_float(&self, key: &str, default: f64) -> f64 {
        match self.get(key) {
            Some(PrefValue::Float(v)) => v,
            Some(PrefValue::Int(v)) => v as f64,
            _ => default,
        }
    }

    /// String value
    fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key) {
            Some(PrefValue::String(v)) => Some(v),
            _ => None,
        }
    }

    /// Whether the key is present
    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Staged preference mutations
///
/// Nothing is visible until [`apply`](Editor::apply) is called.
#[must_use = "changes are discarded unless `apply` is called"]
pub struct Editor<'a> {
    store: &'a dyn KeyValueStore,
    changes: Changes,
}

impl<'a> Editor<'a> {
    /// Create an editor bound to a store
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self {
            store,
            changes: Changes::default(),
        }
    }

    /// Stage an integer
    pub fn put_int(mut self, key: impl Into<String>, value: i64) -> Self {
        self.changes
            .entries
            .insert(key.into(), Some(PrefValue::Int(value)));
        self
    }

    /// Stage a float
    pub fn put_float(mut self, key: impl Into<String>, value: f64) -> Self {
        self.changes
            .entries
            .insert(key.into(), Some(PrefValue::Float(value)));
        self
    }

    /// Stage a string
    pub fn put_string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.changes
            .entries
            .insert(key.into(), Some(PrefValue::String(value.into())));
        self
    }

    /// Stage a removal
    pub fn remove(mut self, key: impl Into<String>) -> Self {
        self.changes.entries.insert(key.into(), None);
        self
    }

    /// Drop all existing keys before the staged puts are applied
    pub fn clear(mut self) -> Self {
        self.changes.clear = true;
        self
    }

    /// Commit the staged changes; returns whether the cache changed
    pub fn apply(self) -> bool {
        self.store.commit(self.changes)
    }
}
