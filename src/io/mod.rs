mod http;
mod local;
mod multipart;

pub use http::HttpSource;
pub use local::FileSource;

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::ZipResult;

/// Half-open byte interval `[start, start + length)` in a backing source.
///
/// The [`Display`](fmt::Display) rendering is the inclusive `start-end`
/// form used in an HTTP `Range` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub length: u64,
}

impl ByteRange {
    pub fn new(start: u64, length: u64) -> Self {
        Self { start, length }
    }

    /// Exclusive end offset.
    pub fn end(&self) -> u64 {
        self.start + self.length
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end().saturating_sub(1))
    }
}

/// Trait for random-access reading from a data source.
///
/// Implementations exist for local files ([`FileSource`]) and remote HTTP
/// resources ([`HttpSource`]). All reads are exact: a source that cannot
/// produce the full requested range fails instead of returning a prefix.
#[async_trait]
pub trait RangeSource: Send + Sync {
    /// Read exactly `range.length` bytes starting at `range.start`.
    async fn read(&self, range: ByteRange) -> ZipResult<Bytes>;

    /// Read every range, returning the parts in input order.
    async fn read_many(&self, ranges: &[ByteRange]) -> ZipResult<Vec<Bytes>>;

    /// Read the final `length` bytes of the source.
    async fn read_tail(&self, length: u64) -> ZipResult<Bytes>;

    /// Release the underlying resources.
    async fn close(&self) -> ZipResult<()>;
}
