//! File-backed preference store
//!
//! # Write Protocol
//!
//! Every committed change bumps the memory epoch and schedules a background
//! write tagged with that epoch. The writer serializes on the disk lock and
//! drops its work if the disk already caught up or a newer epoch superseded
//! it, so bursts of commits coalesce into one write.
//!
//! ```text
//! <file> exists, no <file>.bak  → rename <file> to <file>.bak
//! write full snapshot to <file> (fsync)
//!   ok   → delete <file>.bak, advance disk epoch
//!   fail → delete partial <file>, keep <file>.bak
//! ```
//!
//! # Load Protocol
//!
//! A backup present at startup means the previous process died mid-write:
//! the (possibly partial) current file is deleted and the backup promoted.
//! Absent, empty, or unparsable files load as an empty map.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Condvar, Mutex};

use super::{Changes, Editor, KeyValueStore, PrefMap, PrefValue};
use crate::StorageResult;

/// Crash-safe single-file preference store
///
/// Cheap to clone; clones share the same cache and file.
#[derive(Clone)]
pub struct FilePreferences {
    inner: Arc<Inner>,
}

struct Inner {
    path: PathBuf,
    backup_path: PathBuf,

    /// Cache, load flag and memory epoch, guarded together
    cache: Mutex<Cache>,

    /// Signalled once the initial load completes
    loaded: Condvar,

    /// Serializes disk writes
    disk_lock: Mutex<()>,

    /// Epoch of the snapshot currently on disk
    disk_epoch: AtomicU64,
}

struct Cache {
    map: PrefMap,
    loaded: bool,
    memory_epoch: u64,
}

impl FilePreferences {
    /// Open the store at `path`, loading it in the background
    ///
    /// Reads block until the load finishes.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let backup_path = backup_path_for(&path);
        let inner = Arc::new(Inner {
            path,
            backup_path,
            cache: Mutex::new(Cache {
                map: PrefMap::new(),
                loaded: false,
                memory_epoch: 0,
            }),
            loaded: Condvar::new(),
            disk_lock: Mutex::new(()),
            disk_epoch: AtomicU64::new(0),
        });

        let loader = Arc::clone(&inner);
        let spawned = std::thread::Builder::new()
            .name("beacon-prefs-load".into())
            .spawn(move || loader.load());
        if let Err(e) = spawned {
            tracing::warn!(error = %e, "could not spawn preference loader, loading inline");
            inner.load();
        }

        Self { inner }
    }

    /// Path of the preference file
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Epoch of the in-memory cache
    pub fn memory_epoch(&self) -> u64 {
        self.inner.wait_loaded().memory_epoch
    }

    /// Epoch of the snapshot on disk
    pub fn disk_epoch(&self) -> u64 {
        self.inner.disk_epoch.load(Ordering::Acquire)
    }

    fn schedule_write(&self, epoch: u64) {
        let inner = Arc::clone(&self.inner);
        let task = move || {
            if let Err(e) = inner.persist(Some(epoch)) {
                tracing::error!(
                    path = %inner.path.display(),
                    epoch,
                    error = %e,
                    "failed to persist preferences"
                );
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(task);
            }
            Err(_) => {
                let spawned = std::thread::Builder::new()
                    .name("beacon-prefs-write".into())
                    .spawn(task);
                if let Err(e) = spawned {
                    tracing::error!(error = %e, "could not spawn preference writer");
                }
            }
        }
    }
}

impl KeyValueStore for FilePreferences {
    fn get(&self, key: &str) -> Option<PrefValue> {
        self.inner.wait_loaded().map.get(key).cloned()
    }

    fn all(&self) -> PrefMap {
        self.inner.wait_loaded().map.clone()
    }

    fn edit(&self) -> Editor<'_> {
        Editor::new(self)
    }

    fn commit(&self, changes: Changes) -> bool {
        let epoch = {
            let mut cache = self.inner.wait_loaded();
            if !changes.apply_to(&mut cache.map) {
                return false;
            }
            cache.memory_epoch += 1;
            cache.memory_epoch
        };
        self.schedule_write(epoch);
        true
    }

    fn sync(&self) -> StorageResult<()> {
        self.inner.persist(None)
    }
}

impl Inner {
    /// Lock the cache, waiting for the initial load
    fn wait_loaded(&self) -> parking_lot::MutexGuard<'_, Cache> {
        let mut cache = self.cache.lock();
        while !cache.loaded {
            self.loaded.wait(&mut cache);
        }
        cache
    }

    fn load(&self) {
        let map = match self.recover_and_read() {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "unreadable preference file, starting empty"
                );
                PrefMap::new()
            }
        };

        let mut cache = self.cache.lock();
        cache.map = map;
        cache.loaded = true;
        drop(cache);
        self.loaded.notify_all();
    }

    fn recover_and_read(&self) -> io::Result<PrefMap> {
        if self.backup_path.exists() {
            if self.path.exists() {
                fs::remove_file(&self.path)?;
            }
            fs::rename(&self.backup_path, &self.path)?;
            tracing::info!(
                path = %self.path.display(),
                "restored preferences from backup"
            );
        }

        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(PrefMap::new()),
            Err(e) => return Err(e),
        };
        if contents.trim().is_empty() {
            return Ok(PrefMap::new());
        }

        Ok(serde_json::from_str(&contents).unwrap_or_else(|e| {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "malformed preference file, starting empty"
            );
            PrefMap::new()
        }))
    }

    /// Write the cache to disk if it is ahead of the disk
    ///
    /// With `expected`, the write is skipped unless that epoch is still the
    /// current memory epoch.
    fn persist(&self, expected: Option<u64>) -> StorageResult<()> {
        let _disk = self.disk_lock.lock();

        let (epoch, snapshot) = {
            let cache = self.wait_loaded();
            (cache.memory_epoch, cache.map.clone())
        };

        if self.disk_epoch.load(Ordering::Acquire) >= epoch {
            return Ok(());
        }
        if let Some(expected) = expected
            && expected != epoch
        {
            tracing::trace!(expected, current = epoch, "superseded preference write dropped");
            return Ok(());
        }

        self.write_snapshot(&snapshot)?;
        self.disk_epoch.store(epoch, Ordering::Release);
        tracing::debug!(path = %self.path.display(), epoch, "preferences persisted");
        Ok(())
    }

    fn write_snapshot(&self, snapshot: &PrefMap) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        if self.path.exists() {
            if self.backup_path.exists() {
                // The backup is the last committed copy; the current file
                // may be a partial write.
                fs::remove_file(&self.path)?;
            } else {
                fs::rename(&self.path, &self.backup_path)?;
            }
        }

        match write_json(&self.path, snapshot) {
            Ok(()) => {
                if let Err(e) = fs::remove_file(&self.backup_path)
                    && e.kind() != io::ErrorKind::NotFound
                {
                    tracing::warn!(error = %e, "failed to delete preference backup");
                }
                Ok(())
            }
            Err(e) => {
                let _ = fs::remove_file(&self.path);
                Err(e)
            }
        }
    }
}

fn write_json(path: &Path, snapshot: &PrefMap) -> StorageResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, snapshot)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

fn backup_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}
