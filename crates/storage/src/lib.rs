//! Beacon - Storage
//!
//! Local persistence for the analytics write path: batch files that frame
//! admitted events into size-bounded JSON documents, and a crash-safe
//! key/value preference store for cursors and cached identity/settings.
//!
//! # Architecture
//!
//! ```text
//! [writer task] --json--> [BatchStore] --bytes--> [ByteStore: file | memory]
//!                              │
//!                              └── cursor / scalars ──> [KeyValueStore: file | memory]
//! ```
//!
//! # Modules
//!
//! - `batch` - Batch framing, rollover and the storage façade
//! - `medium` - Byte storage media (`FileByteStore`, `MemoryByteStore`)
//! - `prefs` - Preference stores (`FilePreferences`, `MemoryPreferences`)
//!
//! # File Layout
//!
//! ```text
//! <root>/segment.prefs/<writeKey>
//! <root>/segment.data/<writeKey>/events/<writeKey>-<index>.tmp   # open
//! <root>/segment.data/<writeKey>/events/<writeKey>-<index>.json  # finalized
//! ```

mod batch;
mod error;
mod key;
pub mod medium;
pub mod prefs;

use std::path::{Path, PathBuf};

pub use batch::BatchStore;
pub use error::{StorageError, StorageResult};
pub use key::StorageKey;
pub use medium::{ByteStore, FileByteStore, MemoryByteStore};
pub use prefs::{Editor, FilePreferences, KeyValueStore, MemoryPreferences, PrefValue};

/// Path of the preference file for a write key
pub fn prefs_path(root: &Path, write_key: &str) -> PathBuf {
    root.join("segment.prefs").join(write_key)
}

/// Directory holding batch files for a write key
pub fn events_dir(root: &Path, write_key: &str) -> PathBuf {
    root.join("segment.data").join(write_key).join("events")
}
