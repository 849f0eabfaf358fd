//! Batch Store - framing admitted events into batch files
//!
//! Turns a stream of serialized events into well-formed JSON batch
//! documents bounded by size:
//!
//! ```text
//! absent ──write──> open {"batch":[e1,e2,...  ──rollover──> finalized ...],"sentAt":..,"writeKey":..}
//! ```
//!
//! The store also fronts the preference store, so callers have one storage
//! handle: `StorageKey::Events` routes to batch framing, every other key is
//! a scalar preference.
//!
//! # Concurrency
//!
//! `write` and `rollover` hold one mutex for their whole duration so the
//! open file is never interleaved. `read_as_bytes` and `remove_file` only
//! touch finalized entries and take no lock.
//!
//! # Recovery
//!
//! The cursor is persisted asynchronously and may lag behind the medium
//! after a crash. On open the cursor is raised past every batch already on
//! the medium; open entries below it are sealed, and an open entry at the
//! cursor is resumed (or sealed when its footer was already written). A
//! new batch never reuses the name of a finalized one.

use std::sync::Arc;

use beacon_protocol::{
    BATCH_HEADER, BATCH_SEPARATOR, MAX_BATCH_SIZE, MAX_EVENT_SIZE, WriteKey, batch_footer,
    iso8601_now,
};
use parking_lot::Mutex;

use crate::medium::{ByteStore, FileByteStore, MemoryByteStore};
use crate::prefs::{FilePreferences, KeyValueStore, MemoryPreferences};
use crate::{StorageError, StorageKey, StorageResult};

/// State of the currently open batch
#[derive(Debug, Default)]
struct OpenBatch {
    /// Name of the open entry, `None` when no batch is open
    name: Option<String>,

    /// Cursor value the open entry was named after
    index: i64,

    /// Bytes written so far
    len: u64,

    /// Events written so far
    count: usize,

    /// Footer already appended (finalization failed afterwards)
    closed: bool,
}

/// Size-bounded JSON batch files plus scalar preferences
pub struct BatchStore {
    write_key: WriteKey,
    medium: Arc<dyn ByteStore>,
    prefs: Arc<dyn KeyValueStore>,
    open: Mutex<OpenBatch>,
    max_batch_size: u64,
}

impl BatchStore {
    /// Create a store over the given medium and preference store
    ///
    /// Entries left behind by a previous run are recovered first (see the
    /// module docs), so their events are neither lost nor overwritten.
    pub fn new(
        write_key: WriteKey,
        medium: Arc<dyn ByteStore>,
        prefs: Arc<dyn KeyValueStore>,
    ) -> Self {
        let store = Self {
            write_key,
            medium,
            prefs,
            open: Mutex::new(OpenBatch::default()),
            max_batch_size: MAX_BATCH_SIZE as u64,
        };
        if let Err(e) = store.recover() {
            tracing::warn!(
                write_key = %store.write_key,
                error = %e,
                "batch recovery incomplete"
            );
        }
        store
    }

    /// Durable store under `root` using the standard file layout
    pub fn open_file(root: &std::path::Path, write_key: WriteKey) -> StorageResult<Self> {
        let medium = FileByteStore::new(crate::events_dir(root, write_key.as_str()))?;
        let prefs = FilePreferences::open(crate::prefs_path(root, write_key.as_str()));
        Ok(Self::new(write_key, Arc::new(medium), Arc::new(prefs)))
    }

    /// Store that keeps everything in memory
    pub fn in_memory(write_key: WriteKey) -> Self {
        Self::new(
            write_key,
            Arc::new(MemoryByteStore::new()),
            Arc::new(MemoryPreferences::new()),
        )
    }

    /// Override the rollover threshold
    #[must_use]
    pub fn with_max_batch_size(mut self, max: u64) -> Self {
        self.max_batch_size = max;
        self
    }

    /// Write key scoping this store
    #[inline]
    pub fn write_key(&self) -> &WriteKey {
        &self.write_key
    }

    /// Underlying preference store
    pub fn prefs(&self) -> &Arc<dyn KeyValueStore> {
        &self.prefs
    }

    /// Current file-index cursor
    pub fn file_index(&self) -> i64 {
        self.prefs.get_int(&self.write_key.file_index_key(), 0)
    }

    /// Write a value under a storage key
    ///
    /// `Events` admits a serialized event into the open batch; any other
    /// key stores a scalar preference.
    ///
    /// # Errors
    ///
    /// `EventTooLarge` if the event exceeds the per-event cap, `Io` if the
    /// medium fails.
    pub fn write(&self, key: StorageKey, value: &str) -> StorageResult<()> {
        match key {
            StorageKey::Events => self.write_event(value),
            scalar => {
                self.prefs.edit().put_string(scalar.as_str(), value).apply();
                Ok(())
            }
        }
    }

    /// Read a storage key
    ///
    /// For `Events`, the comma-joined identifiers of finalized batches.
    pub fn read(&self, key: StorageKey) -> Option<String> {
        match key {
            StorageKey::Events => match self.pending_batches() {
                Ok(ids) if !ids.is_empty() => Some(ids.join(",")),
                Ok(_) => None,
                Err(e) => {
                    tracing::error!(error = %e, "failed to list batch files");
                    None
                }
            },
            scalar => self.prefs.get_string(scalar.as_str()),
        }
    }

    /// Remove a scalar key; returns whether it existed
    pub fn remove(&self, key: StorageKey) -> StorageResult<bool> {
        if !key.is_scalar() {
            return Err(StorageError::UnsupportedKey(key.as_str()));
        }
        Ok(self.prefs.edit().remove(key.as_str()).apply())
    }

    /// Identifiers of finalized batches awaiting upload, oldest first
    pub fn pending_batches(&self) -> StorageResult<Vec<String>> {
        Ok(self.medium.list_finalized()?)
    }

    /// Raw bytes of a finalized batch
    pub fn read_as_bytes(&self, id: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.medium.read(id)?)
    }

    /// Delete a finalized batch; returns whether it existed
    pub fn remove_file(&self, id: &str) -> StorageResult<bool> {
        Ok(self.medium.remove(id)?)
    }

    /// Finalize the open batch, if any, and advance the cursor
    pub fn rollover(&self) -> StorageResult<()> {
        let mut open = self.open.lock();
        self.rollover_locked(&mut open)
    }

    fn write_event(&self, json: &str) -> StorageResult<()> {
        if json.len() > MAX_EVENT_SIZE {
            return Err(StorageError::event_too_large(json.len(), MAX_EVENT_SIZE));
        }

        let mut open = self.open.lock();

        if open.name.is_some() && (open.closed || open.len > self.max_batch_size) {
            self.rollover_locked(&mut open)?;
        }

        let name = match &open.name {
            Some(name) => name.clone(),
            None => {
                let index = self.claim_index(self.file_index())?;
                let name = self.write_key.batch_file_name(index);
                self.medium.append(&name, BATCH_HEADER.as_bytes())?;
                *open = OpenBatch {
                    name: Some(name.clone()),
                    index,
                    len: BATCH_HEADER.len() as u64,
                    count: 0,
                    closed: false,
                };
                name
            }
        };

        let mut chunk = String::with_capacity(json.len() + 1);
        if open.count > 0 {
            chunk.push_str(BATCH_SEPARATOR);
        }
        chunk.push_str(json);

        self.medium.append(&name, chunk.as_bytes())?;
        open.len += chunk.len() as u64;
        open.count += 1;
        Ok(())
    }

    fn rollover_locked(&self, open: &mut OpenBatch) -> StorageResult<()> {
        let Some(name) = open.name.clone() else {
            return Ok(());
        };

        if !open.closed {
            let footer = batch_footer(&iso8601_now(), self.write_key.as_str());
            self.medium.append(&name, footer.as_bytes())?;
            open.closed = true;
        }
        let (index, id) = self.finalize_entry(&name, open.index)?;
        self.advance_cursor(index + 1);

        tracing::debug!(
            write_key = %self.write_key,
            file = %id,
            events = open.count,
            bytes = open.len,
            "batch finalized"
        );

        *open = OpenBatch::default();
        Ok(())
    }

    /// Finalize `name`, moving it to a free index if its own is taken
    fn finalize_entry(&self, name: &str, index: i64) -> StorageResult<(i64, String)> {
        match self.medium.finalize(name, name) {
            Ok(id) => Ok((index, id)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let free = self.claim_index(index + 1)?;
                let target = self.write_key.batch_file_name(free);
                tracing::warn!(
                    write_key = %self.write_key,
                    file = %name,
                    target = %target,
                    "batch name already finalized, renumbering"
                );
                Ok((free, self.medium.finalize(name, &target)?))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// First index at or above `from` with no finalized batch
    fn claim_index(&self, from: i64) -> StorageResult<i64> {
        let mut index = from;
        while self
            .medium
            .is_finalized(&self.write_key.batch_file_name(index))?
        {
            index += 1;
        }
        if index != from {
            tracing::warn!(
                write_key = %self.write_key,
                cursor = from,
                index,
                "cursor behind finalized batches"
            );
        }
        Ok(index)
    }

    /// Raise the cursor to `index`; it never moves backwards
    fn advance_cursor(&self, index: i64) {
        if index > self.file_index() {
            self.prefs
                .edit()
                .put_int(self.write_key.file_index_key(), index)
                .apply();
        }
    }

    /// Cursor index encoded in an entry name of this write key
    fn index_of(&self, name: &str) -> Option<i64> {
        name.strip_prefix(self.write_key.as_str())?
            .strip_prefix('-')?
            .parse()
            .ok()
    }

    fn recover(&self) -> StorageResult<()> {
        let mut open = self.open.lock();

        let mut cursor = self.file_index();
        for id in self.medium.list_finalized()? {
            if let Some(index) = self.medium.entry_name(&id).and_then(|n| self.index_of(&n)) {
                cursor = cursor.max(index + 1);
            }
        }

        let mut stale: Vec<(i64, String)> = self
            .medium
            .list_open()?
            .into_iter()
            .filter_map(|name| self.index_of(&name).map(|index| (index, name)))
            .collect();
        stale.sort();
        if let Some((highest, _)) = stale.last() {
            cursor = cursor.max(*highest);
        }
        self.advance_cursor(cursor);

        for (index, name) in stale {
            let bytes = self.medium.read_open(&name)?.unwrap_or_default();
            let closed = is_complete_batch(&bytes);

            if index == cursor && !closed {
                if !bytes.is_empty() {
                    self.resume(&mut open, name, index, bytes.len() as u64);
                }
                continue;
            }

            if bytes.is_empty() {
                self.medium.append(&name, BATCH_HEADER.as_bytes())?;
            }
            if !closed {
                let footer = batch_footer(&iso8601_now(), self.write_key.as_str());
                self.medium.append(&name, footer.as_bytes())?;
            }
            let (sealed, id) = self.finalize_entry(&name, index)?;
            self.advance_cursor(sealed + 1);
            tracing::info!(
                write_key = %self.write_key,
                file = %id,
                "sealed batch left open by previous run"
            );
        }
        Ok(())
    }

    fn resume(&self, open: &mut OpenBatch, name: String, index: i64, len: u64) {
        let header = BATCH_HEADER.len() as u64;
        tracing::info!(
            write_key = %self.write_key,
            file = %name,
            bytes = len,
            "resuming open batch from previous run"
        );
        *open = OpenBatch {
            name: Some(name),
            index,
            len,
            count: usize::from(len > header),
            closed: false,
        };
    }
}

/// Whether `bytes` already hold a complete batch document (footer written)
fn is_complete_batch(bytes: &[u8]) -> bool {
    serde_json::from_slice::<serde::de::IgnoredAny>(bytes).is_ok()
}

impl std::fmt::Debug for BatchStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let open = self.open.lock();
        f.debug_struct("BatchStore")
            .field("write_key", &self.write_key)
            .field("open", &open.name)
            .field("open_len", &open.len)
            .finish()
    }
}

#[cfg(test)]
#[path = "batch_test.rs"]
mod tests;
