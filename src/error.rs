//! Error types emitted by this library.
//!
//! Three kinds of failure surface to callers:
//!
//! - [`RecordError`]: a structural problem in parsed archive bytes. The
//!   message names the failed field; truncated input carries an
//!   [`RecordCause::Incomplete`] cause, any other underlying failure an
//!   [`RecordCause::Unknown`] cause.
//! - [`ZipError::Io`]: a failure in the byte source, the multipart reader,
//!   or the cache.
//! - [`ZipError::NotFound`]: a requested entry name absent from the
//!   central directory.

use std::io;

use thiserror::Error;

/// Generic result type with [`ZipError`] as its error variant.
pub type ZipResult<T> = Result<T, ZipError>;

/// Error type for archive reading.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ZipError {
    /// I/O failure in the byte source, multipart reader, or cache.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// Structural problem in parsed archive bytes.
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Requested entry name is not present in the central directory.
    #[error("file not found in archive: {0}")]
    NotFound(String),

    /// Caller misuse, e.g. requesting extraction of an empty name list.
    #[error("precondition violated: {0}")]
    Precondition(&'static str),
}

/// A structural problem found while decoding a ZIP record.
///
/// `record` names the record being parsed, `message` the failed field.
/// No parse error is recovered locally; every validation failure unwinds
/// to the caller with its original message.
#[derive(Debug, Error)]
#[error("{record}: {message}")]
pub struct RecordError {
    record: &'static str,
    message: String,
    #[source]
    cause: Option<RecordCause>,
}

impl RecordError {
    /// A validation failure; `message` identifies the offending field.
    pub(crate) fn field(record: &'static str, message: impl Into<String>) -> Self {
        Self {
            record,
            message: message.into(),
            cause: None,
        }
    }

    /// Buffer underflow while reading the record.
    pub(crate) fn incomplete(record: &'static str, err: io::Error) -> Self {
        Self {
            record,
            message: "record truncated".to_string(),
            cause: Some(RecordCause::Incomplete(err)),
        }
    }

    /// Any other unexpected failure while decoding the record.
    pub(crate) fn unknown(
        record: &'static str,
        err: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            record,
            message: "unexpected decode failure".to_string(),
            cause: Some(RecordCause::Unknown(Box::new(err))),
        }
    }

    /// The record the failure occurred in.
    pub fn record(&self) -> &'static str {
        self.record
    }

    /// The failure message, naming the offending field where applicable.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The underlying cause classification, if any.
    pub fn cause(&self) -> Option<&RecordCause> {
        self.cause.as_ref()
    }

    /// Whether this failure was caused by buffer underflow.
    pub fn is_incomplete(&self) -> bool {
        matches!(self.cause, Some(RecordCause::Incomplete(_)))
    }
}

/// Classification of what sat underneath a [`RecordError`].
#[derive(Debug, Error)]
pub enum RecordCause {
    /// The input buffer ended before the record did.
    #[error("Incomplete: {0}")]
    Incomplete(#[source] io::Error),

    /// Some other failure, e.g. invalid UTF-8 in a flagged name.
    #[error("Unknown: {0}")]
    Unknown(#[source] Box<dyn std::error::Error + Send + Sync>),
}
