use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::RwLock;

use super::{EntryCache, EntryStream};
use crate::error::ZipResult;

/// Temp-file-backed cache.
///
/// `put` drains the stream into one temp file per entry; `get` opens a
/// fresh reader on it, so cached entries are replayable. Temp files live
/// in the process temp directory, named after the entry (with `/`
/// flattened to `-`) plus a `.tmp` suffix, and are deleted on `remove`,
/// `clear`, or drop.
#[derive(Default)]
pub struct FileCache {
    entries: RwLock<HashMap<String, PathBuf>>,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the temp file backing `name`, if cached.
    pub fn path_of(&self, name: &str) -> Option<PathBuf> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(name).cloned()
    }
}

impl EntryCache for FileCache {
    fn put(&self, name: &str, mut stream: EntryStream) -> ZipResult<()> {
        let prefix = format!("{}-", name.replace('/', "-"));
        let mut temp = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".tmp")
            .tempfile()?;
        io::copy(&mut stream, temp.as_file_mut())?;

        let path = temp.into_temp_path().keep().map_err(|e| e.error)?;

        let previous = {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            entries.insert(name.to_string(), path)
        };
        if let Some(stale) = previous {
            let _ = std::fs::remove_file(stale);
        }
        Ok(())
    }

    fn get(&self, name: &str) -> ZipResult<Option<EntryStream>> {
        let path = {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            entries.get(name).cloned()
        };
        match path {
            Some(path) => {
                let file = File::open(path)?;
                Ok(Some(Box::new(file) as EntryStream))
            }
            None => Ok(None),
        }
    }

    fn contains(&self, name: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.contains_key(name)
    }

    fn remove(&self, name: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if let Some(path) = entries.get(name) {
            // Keep the mapping when the file refuses to go away, so a
            // later clear can retry.
            if std::fs::remove_file(path).is_ok() || !path.exists() {
                entries.remove(name);
            }
        }
    }

    fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        for path in entries.values() {
            let _ = std::fs::remove_file(path);
        }
        entries.clear();
    }
}

impl Drop for FileCache {
    fn drop(&mut self) {
        self.clear();
    }
}
