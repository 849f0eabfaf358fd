//! Local storage configuration
//!
//! Durable layout under `root`:
//!
//! ```text
//! <root>/segment.prefs/<writeKey>
//! <root>/segment.data/<writeKey>/events/<writeKey>-<index>[.tmp|.json]
//! ```

use std::path::PathBuf;

use serde::Deserialize;

/// Byte storage medium backing the batch and preference stores
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageMedium {
    /// Real files under `root`
    #[default]
    File,
    /// In-memory buffers (stateless/server deployments, tests)
    Memory,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for preference and batch files
    /// Default: current directory
    pub root: PathBuf,

    /// Storage medium
    /// Default: file
    pub medium: StorageMedium,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            medium: StorageMedium::File,
        }
    }
}

impl StorageConfig {
    /// Directory holding preference files
    pub fn prefs_dir(&self) -> PathBuf {
        self.root.join("segment.prefs")
    }

    /// Directory holding batch files for a write key
    pub fn events_dir(&self, write_key: &str) -> PathBuf {
        self.root
            .join("segment.data")
            .join(write_key)
            .join("events")
    }
}
