//! Caches for decompressed entry bodies.
//!
//! Two interchangeable policies sit behind [`EntryCache`]:
//!
//! - [`MemoryCache`] retains the stream itself; `get` hands it out and
//!   forgets it, so each cached entry can be read once per `put`.
//! - [`FileCache`] drains the stream into a temp file at `put` time and
//!   opens a fresh reader per `get`, so entries are replayable.

mod file;
mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

use std::io::Read;

use crate::error::ZipResult;

/// A consumer-facing stream of uncompressed entry bytes.
pub type EntryStream = Box<dyn Read + Send>;

/// Storage for decompressed entry bodies, keyed by entry name.
pub trait EntryCache: Send + Sync {
    /// Store `stream` under `name`, replacing any previous entry.
    fn put(&self, name: &str, stream: EntryStream) -> ZipResult<()>;

    /// Produce a reader over the cached bytes, or `None` when absent.
    ///
    /// Whether a second `get` for the same `put` succeeds is
    /// policy-dependent; see the implementations.
    fn get(&self, name: &str) -> ZipResult<Option<EntryStream>>;

    /// Whether `name` currently has a cached body.
    fn contains(&self, name: &str) -> bool;

    /// Drop the entry, releasing its backing storage.
    fn remove(&self, name: &str);

    /// Drop every entry.
    fn clear(&self);
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use super::*;

    fn stream(data: &[u8]) -> EntryStream {
        Box::new(Cursor::new(data.to_vec()))
    }

    fn drain(mut stream: EntryStream) -> Vec<u8> {
        let mut out = Vec::new();
        stream.read_to_end(&mut out).expect("drain stream");
        out
    }

    #[test]
    fn memory_cache_streams_are_single_use() {
        let cache = MemoryCache::new();
        cache.put("a.txt", stream(b"alpha")).unwrap();

        assert!(cache.contains("a.txt"));
        assert_eq!(drain(cache.get("a.txt").unwrap().unwrap()), b"alpha");
        // The stream left with the first get.
        assert!(!cache.contains("a.txt"));
        assert!(cache.get("a.txt").unwrap().is_none());
    }

    #[test]
    fn file_cache_streams_are_replayable() {
        let cache = FileCache::new();
        cache.put("b.txt", stream(b"bravo")).unwrap();

        assert_eq!(drain(cache.get("b.txt").unwrap().unwrap()), b"bravo");
        assert!(cache.contains("b.txt"));
        assert_eq!(drain(cache.get("b.txt").unwrap().unwrap()), b"bravo");
    }

    #[test]
    fn file_cache_names_carry_the_entry_name() {
        let cache = FileCache::new();
        cache.put("dir/nested.txt", stream(b"x")).unwrap();

        let path = cache.path_of("dir/nested.txt").unwrap();
        let file_name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(file_name.starts_with("dir-nested.txt"));
        assert!(file_name.ends_with(".tmp"));
    }

    #[test]
    fn remove_deletes_the_backing_file() {
        let cache = FileCache::new();
        cache.put("c.txt", stream(b"charlie")).unwrap();
        let path = cache.path_of("c.txt").unwrap();
        assert!(path.exists());

        cache.remove("c.txt");
        assert!(!cache.contains("c.txt"));
        assert!(!path.exists());
    }

    #[test]
    fn clear_deletes_every_backing_file() {
        let cache = FileCache::new();
        cache.put("one", stream(b"1")).unwrap();
        cache.put("two", stream(b"2")).unwrap();
        let paths = [
            cache.path_of("one").unwrap(),
            cache.path_of("two").unwrap(),
        ];

        cache.clear();
        assert!(!cache.contains("one"));
        assert!(!cache.contains("two"));
        for path in paths {
            assert!(!path.exists());
        }
    }

    #[test]
    fn memory_cache_remove_and_clear() {
        let cache = MemoryCache::new();
        cache.put("a", stream(b"1")).unwrap();
        cache.put("b", stream(b"2")).unwrap();

        cache.remove("a");
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));

        cache.clear();
        assert!(!cache.contains("b"));
    }

    #[test]
    fn put_replaces_existing_entry() {
        let cache = MemoryCache::new();
        cache.put("a", stream(b"old")).unwrap();
        cache.put("a", stream(b"new")).unwrap();
        assert_eq!(drain(cache.get("a").unwrap().unwrap()), b"new");
    }
}
