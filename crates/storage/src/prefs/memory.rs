//! In-memory preference store
//!
//! Same contract as the file store without persistence, for stateless
//! deployments and tests.

use std::sync::Arc;

use parking_lot::Mutex;

use super::{Changes, Editor, KeyValueStore, PrefMap, PrefValue};
use crate::StorageResult;

/// Preference store that never touches disk
#[derive(Clone, Default)]
pub struct MemoryPreferences {
    map: Arc<Mutex<PrefMap>>,
}

impl MemoryPreferences {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<PrefValue> {
        self.map.lock().get(key).cloned()
    }

    fn all(&self) -> PrefMap {
        self.map.lock().clone()
    }

    fn edit(&self) -> Editor<'_> {
        Editor::new(self)
    }

    fn commit(&self, changes: Changes) -> bool {
        changes.apply_to(&mut self.map.lock())
    }

    fn sync(&self) -> StorageResult<()> {
        Ok(())
    }
}
