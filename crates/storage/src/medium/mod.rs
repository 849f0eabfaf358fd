//! Byte storage media
//!
//! A medium holds named byte entries that are either *open* (appendable) or
//! *finalized* (read-only, listed for upload). The batch store only speaks
//! this interface, so files and in-memory buffers satisfy the same contract.

mod file;
mod memory;

use std::io;

pub use file::FileByteStore;
pub use memory::MemoryByteStore;

/// Storage medium for batch files
pub trait ByteStore: Send + Sync {
    /// Append to the open entry `name`, creating it if absent
    fn append(&self, name: &str, bytes: &[u8]) -> io::Result<()>;

    /// Length of the open entry `name`, or `None` if there is none
    fn open_len(&self, name: &str) -> io::Result<Option<u64>>;

    /// Full contents of the open entry `name`, or `None` if there is none
    fn read_open(&self, name: &str) -> io::Result<Option<Vec<u8>>>;

    /// Names of all open entries
    fn list_open(&self) -> io::Result<Vec<String>>;

    /// Whether a finalized entry named `name` exists
    fn is_finalized(&self, name: &str) -> io::Result<bool>;

    /// Finalize the open entry `name` as `target`, returning its identifier
    ///
    /// Fails with `AlreadyExists` instead of replacing a finalized entry.
    fn finalize(&self, name: &str, target: &str) -> io::Result<String>;

    /// Identifiers of all finalized entries, oldest first
    fn list_finalized(&self) -> io::Result<Vec<String>>;

    /// Entry name behind a finalized identifier
    fn entry_name(&self, id: &str) -> Option<String>;

    /// Contents of a finalized entry, or `None` if it does not exist
    fn read(&self, id: &str) -> io::Result<Option<Vec<u8>>>;

    /// Delete a finalized entry; returns whether it existed
    fn remove(&self, id: &str) -> io::Result<bool>;
}

pub(crate) fn already_finalized(name: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("batch {} is already finalized", name),
    )
}

/// Numeric suffix of `<writeKey>-<index>` names, for oldest-first ordering
pub(crate) fn batch_index(name: &str) -> Option<i64> {
    name.rsplit_once('-').and_then(|(_, idx)| idx.parse().ok())
}

#[cfg(test)]
#[path = "medium_test.rs"]
mod tests;
