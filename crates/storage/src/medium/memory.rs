//! In-memory medium

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{ByteStore, already_finalized};

#[derive(Debug, Default)]
struct Buffer {
    data: Vec<u8>,
    finalized: bool,
    /// Finalization order
    seq: u64,
}

#[derive(Debug, Default)]
struct Buffers {
    entries: HashMap<String, Buffer>,
    next_seq: u64,
}

/// Named buffers held in memory
///
/// Cheap to clone; clones share the same buffers.
#[derive(Debug, Clone, Default)]
pub struct MemoryByteStore {
    buffers: Arc<Mutex<Buffers>>,
}

impl MemoryByteStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl ByteStore for MemoryByteStore {
    fn append(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        let mut buffers = self.buffers.lock();
        let buffer = buffers.entries.entry(name.to_string()).or_default();
        if buffer.finalized {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("batch {} is finalized", name),
            ));
        }
        buffer.data.extend_from_slice(bytes);
        Ok(())
    }

    fn open_len(&self, name: &str) -> io::Result<Option<u64>> {
        let buffers = self.buffers.lock();
        Ok(buffers
            .entries
            .get(name)
            .filter(|b| !b.finalized)
            .map(|b| b.data.len() as u64))
    }

    fn read_open(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        let buffers = self.buffers.lock();
        Ok(buffers
            .entries
            .get(name)
            .filter(|b| !b.finalized)
            .map(|b| b.data.clone()))
    }

    fn list_open(&self) -> io::Result<Vec<String>> {
        let buffers = self.buffers.lock();
        Ok(buffers
            .entries
            .iter()
            .filter(|(_, b)| !b.finalized)
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn is_finalized(&self, name: &str) -> io::Result<bool> {
        let buffers = self.buffers.lock();
        Ok(buffers.entries.get(name).is_some_and(|b| b.finalized))
    }

    fn finalize(&self, name: &str, target: &str) -> io::Result<String> {
        let mut buffers = self.buffers.lock();
        if !buffers.entries.get(name).is_some_and(|b| !b.finalized) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no open batch named {}", name),
            ));
        }
        if name != target && buffers.entries.contains_key(target) {
            return Err(already_finalized(target));
        }

        let seq = buffers.next_seq;
        buffers.next_seq += 1;
        if let Some(mut buffer) = buffers.entries.remove(name) {
            buffer.finalized = true;
            buffer.seq = seq;
            buffers.entries.insert(target.to_string(), buffer);
        }
        Ok(target.to_string())
    }

    fn list_finalized(&self) -> io::Result<Vec<String>> {
        let buffers = self.buffers.lock();
        let mut finalized: Vec<(u64, &String)> = buffers
            .entries
            .iter()
            .filter(|(_, b)| b.finalized)
            .map(|(name, b)| (b.seq, name))
            .collect();
        finalized.sort();
        Ok(finalized.into_iter().map(|(_, n)| n.clone()).collect())
    }

    fn entry_name(&self, id: &str) -> Option<String> {
        Some(id.to_string())
    }

    fn read(&self, id: &str) -> io::Result<Option<Vec<u8>>> {
        let buffers = self.buffers.lock();
        Ok(buffers
            .entries
            .get(id)
            .filter(|b| b.finalized)
            .map(|b| b.data.clone()))
    }

    fn remove(&self, id: &str) -> io::Result<bool> {
        let mut buffers = self.buffers.lock();
        match buffers.entries.get(id) {
            Some(b) if b.finalized => {
                buffers.entries.remove(id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
