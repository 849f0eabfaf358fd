//! File medium
//!
//! Open entries are `<dir>/<name>.tmp`; finalization renames them to
//! `<dir>/<name>.json`. Finalized identifiers are full paths.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::{ByteStore, already_finalized, batch_index};

const OPEN_EXTENSION: &str = "tmp";
const FINAL_EXTENSION: &str = "json";

/// Batch files in one directory
#[derive(Debug, Clone)]
pub struct FileByteStore {
    dir: PathBuf,
}

impl FileByteStore {
    /// Use `dir` for batch files, creating it if needed
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory holding the batch files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn open_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, OPEN_EXTENSION))
    }

    fn final_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, FINAL_EXTENSION))
    }

    /// Names of entries in `dir` carrying `extension`
    fn names_with(&self, extension: &str) -> io::Result<Vec<String>> {
        let suffix = format!(".{}", extension);
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let file_name = entry?.file_name();
            if let Some(name) = file_name.to_str().and_then(|n| n.strip_suffix(&suffix)) {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }
}

impl ByteStore for FileByteStore {
    fn append(&self, name: &str, bytes: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.open_path(name))?;
        file.write_all(bytes)?;
        file.flush()
    }

    fn open_len(&self, name: &str) -> io::Result<Option<u64>> {
        match fs::metadata(self.open_path(name)) {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn read_open(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.open_path(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn list_open(&self) -> io::Result<Vec<String>> {
        self.names_with(OPEN_EXTENSION)
    }

    fn is_finalized(&self, name: &str) -> io::Result<bool> {
        self.final_path(name).try_exists()
    }

    fn finalize(&self, name: &str, target: &str) -> io::Result<String> {
        let open = self.open_path(name);
        let finalized = self.final_path(target);
        if finalized.try_exists()? {
            return Err(already_finalized(target));
        }
        {
            let file = OpenOptions::new().append(true).open(&open)?;
            file.sync_all()?;
        }
        fs::rename(&open, &finalized)?;
        Ok(finalized.to_string_lossy().into_owned())
    }

    fn list_finalized(&self) -> io::Result<Vec<String>> {
        let mut entries: Vec<(Option<i64>, PathBuf)> = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(FINAL_EXTENSION) {
                continue;
            }
            let index = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(batch_index);
            entries.push((index, path));
        }
        entries.sort();
        Ok(entries
            .into_iter()
            .map(|(_, p)| p.to_string_lossy().into_owned())
            .collect())
    }

    fn entry_name(&self, id: &str) -> Option<String> {
        let file_name = Path::new(id).file_name()?.to_str()?;
        file_name
            .strip_suffix(&format!(".{}", FINAL_EXTENSION))
            .map(str::to_string)
    }

    fn read(&self, id: &str) -> io::Result<Option<Vec<u8>>> {
        match fs::read(id) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn remove(&self, id: &str) -> io::Result<bool> {
        match fs::remove_file(id) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}
