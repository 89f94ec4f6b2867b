//! Cache-backed extraction over a random-access source.
//!
//! [`ZipReader`] is the consumer surface: it parses the central directory
//! once at construction, then answers metadata queries from the directory
//! map and entry reads from the cache. Cache misses are coalesced into a
//! single multi-range read; each returned part carries one entry's local
//! header plus compressed payload, which is validated, inflated, and
//! parked in the cache.

use std::collections::HashSet;
use std::io::{self, Cursor};

use bytes::Bytes;
use flate2::read::DeflateDecoder;

use crate::cache::{EntryCache, EntryStream};
use crate::error::{ZipError, ZipResult};
use crate::io::RangeSource;
use crate::zip::Directory;

use super::parser::ZipParser;
use super::structures::{CompressionMethod, EntryMetadata, LocalFileHeader, ZipFileEntry};

/// Random-access ZIP reader with cached extraction.
///
/// Generic over the byte source and the cache policy, so the same reader
/// serves local archives ([`FileSource`](crate::FileSource)) and remote
/// ones ([`HttpSource`](crate::HttpSource)), with single-use
/// ([`MemoryCache`](crate::MemoryCache)) or replayable
/// ([`FileCache`](crate::FileCache)) streams.
pub struct ZipReader<S: RangeSource, C: EntryCache> {
    source: S,
    cache: C,
    directory: Directory,
}

impl<S: RangeSource, C: EntryCache> ZipReader<S, C> {
    /// Parse the archive's central directory and build a reader over it.
    pub async fn open(source: S, cache: C) -> ZipResult<Self> {
        let directory = ZipParser::new(&source).load_directory().await?;
        Ok(Self {
            source,
            cache,
            directory,
        })
    }

    /// Names of every entry in the archive, directories included.
    ///
    /// The order is unspecified; callers treat this as a set view.
    pub fn files(&self) -> Vec<String> {
        self.directory.keys().cloned().collect()
    }

    /// The directory map itself.
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    fn entry(&self, name: &str) -> ZipResult<&ZipFileEntry> {
        self.directory
            .get(name)
            .ok_or_else(|| ZipError::NotFound(name.to_string()))
    }

    /// Metadata recorded in the central directory for `name`.
    pub fn file_metadata(&self, name: &str) -> ZipResult<EntryMetadata> {
        Ok(EntryMetadata::from(self.entry(name)?))
    }

    /// Fetch and inflate every named entry that is not already cached.
    ///
    /// All cache misses are fetched with one `read_many` call. Calling
    /// this twice with the same names performs exactly one fetch.
    pub async fn cache_files(&self, names: &[&str]) -> ZipResult<()> {
        if names.is_empty() {
            return Err(ZipError::Precondition(
                "cache_files requires at least one entry name",
            ));
        }

        let mut wanted: Vec<&ZipFileEntry> = Vec::new();
        let mut seen = HashSet::new();
        for name in names {
            let entry = self.entry(name)?;
            if !self.cache.contains(name) && seen.insert(*name) {
                wanted.push(entry);
            }
        }
        if wanted.is_empty() {
            return Ok(());
        }

        let ranges: Vec<_> = wanted.iter().map(|e| e.local_range()).collect();
        let parts = self.source.read_many(&ranges).await?;
        if parts.len() != ranges.len() {
            return Err(ZipError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "byte source returned {} parts for {} ranges",
                    parts.len(),
                    ranges.len()
                ),
            )));
        }

        for (entry, part) in wanted.iter().zip(parts) {
            let stream = self.decode_part(part)?;
            self.cache.put(&entry.file_name, stream)?;
        }
        Ok(())
    }

    /// Validate one fetched part against the directory and wrap its
    /// payload in a decompressing stream.
    fn decode_part(&self, part: Bytes) -> ZipResult<EntryStream> {
        let mut cursor = Cursor::new(&part[..]);
        let lfh = LocalFileHeader::parse(&mut cursor, &self.directory)?;

        let data_start = cursor.position() as usize;
        let data_end = data_start + lfh.compressed_size as usize;
        if part.len() < data_end {
            return Err(ZipError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "part for {:?} holds {} bytes, {} expected",
                    lfh.file_name,
                    part.len(),
                    data_end
                ),
            )));
        }
        let compressed = part.slice(data_start..data_end);

        Ok(match lfh.compression_method {
            CompressionMethod::Stored => Box::new(Cursor::new(compressed)),
            // ZIP stores raw deflate, no zlib wrapper.
            CompressionMethod::Deflate => Box::new(DeflateDecoder::new(Cursor::new(compressed))),
        })
    }

    /// Stream of uncompressed bytes for one entry.
    ///
    /// Under the memory cache policy the stream may be taken once per
    /// fetch; under the file cache policy repeated calls re-read the
    /// cached temp file.
    pub async fn file_stream(&self, name: &str) -> ZipResult<EntryStream> {
        self.cache_files(&[name]).await?;
        self.cache
            .get(name)?
            .ok_or_else(|| ZipError::NotFound(name.to_string()))
    }

    /// Streams for several entries, in the order the names were given.
    /// Misses are fetched with a single bulk read.
    pub async fn file_streams(&self, names: &[&str]) -> ZipResult<Vec<(String, EntryStream)>> {
        self.cache_files(names).await?;
        let mut streams = Vec::with_capacity(names.len());
        for name in names {
            let stream = self
                .cache
                .get(name)?
                .ok_or_else(|| ZipError::NotFound(name.to_string()))?;
            streams.push((name.to_string(), stream));
        }
        Ok(streams)
    }

    /// Transfer statistics hook: the underlying source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Release the byte source and every cached body.
    ///
    /// Consuming the reader also releases the directory map; a closed
    /// reader cannot be used again by construction.
    pub async fn close(self) -> ZipResult<()> {
        self.cache.clear();
        self.source.close().await
    }
}
