use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use super::{EntryCache, EntryStream};
use crate::error::ZipResult;

/// In-memory cache that retains the streams themselves.
///
/// `get` removes the stream from the map, so a cached entry answers one
/// `get` per `put`. Streams are exclusively owned; the per-entry `Mutex`
/// keeps the map shareable across concurrent readers.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Mutex<EntryStream>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntryCache for MemoryCache {
    fn put(&self, name: &str, stream: EntryStream) -> ZipResult<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(name.to_string(), Mutex::new(stream));
        Ok(())
    }

    fn get(&self, name: &str) -> ZipResult<Option<EntryStream>> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        Ok(entries
            .remove(name)
            .map(|m| m.into_inner().unwrap_or_else(|e| e.into_inner())))
    }

    fn contains(&self, name: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.contains_key(name)
    }

    fn remove(&self, name: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(name);
    }

    fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }
}
