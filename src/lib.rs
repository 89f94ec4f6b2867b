//! # rangezip
//!
//! A random-access reader for ZIP archives (ZIP64 and AppX included) that
//! works equally over local files and remote HTTP resources.
//!
//! The directory is parsed from a single tail read, so listing a remote
//! archive costs a handful of small range requests. Extracting a set of
//! entries coalesces them into one multi-range request; the
//! `multipart/byteranges` response is split, each local header validated
//! against the central directory, and the inflated bodies parked in a
//! cache for the consumer to stream.
//!
//! ## Features
//!
//! - Enumerate and selectively extract entries without downloading the
//!   whole archive
//! - ZIP64 support via sentinel-driven trailer promotion
//! - STORED and DEFLATE compression methods
//! - Interchangeable cache policies: in-memory (single-use streams) or
//!   temp-file backed (replayable streams)
//!
//! ## Example
//!
//! ```no_run
//! use rangezip::{HttpSource, MemoryCache, ZipReader};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let source = HttpSource::new("https://example.com/archive.zip".to_string()).await?;
//!     let reader = ZipReader::open(source, MemoryCache::new()).await?;
//!
//!     for name in reader.files() {
//!         println!("{name}");
//!     }
//!
//!     let mut stream = reader.file_stream("README.md").await?;
//!     let mut contents = Vec::new();
//!     std::io::Read::read_to_end(&mut stream, &mut contents)?;
//!
//!     reader.close().await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod cli;
pub mod error;
pub mod io;
pub mod zip;

pub use cache::{EntryCache, EntryStream, FileCache, MemoryCache};
pub use cli::Cli;
pub use error::{RecordCause, RecordError, ZipError, ZipResult};
pub use io::{ByteRange, FileSource, HttpSource, RangeSource};
pub use zip::{EntryMetadata, ZipFileEntry, ZipReader};
