//! HTTP Range source for remote archives.
//!
//! Implements random access over HTTP using the `Range` request header
//! (RFC 7233). Single ranges come back as a raw body; requests for two or
//! more ranges come back as one `multipart/byteranges` response that is
//! split into parts by [`super::multipart`].

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response, StatusCode};

use super::multipart;
use super::{ByteRange, RangeSource};
use crate::error::{ZipError, ZipResult};

fn request_error(err: reqwest::Error) -> ZipError {
    ZipError::Io(io::Error::other(err))
}

fn status_error(status: StatusCode) -> ZipError {
    ZipError::Io(io::Error::other(format!(
        "HTTP request failed with status: {status}"
    )))
}

/// HTTP Range source for remote archives.
///
/// Construction performs a HEAD request to verify the server answers
/// successfully, advertises `Accept-Ranges: bytes`, and reports a
/// `Content-Length`. Every read then becomes a `GET` with a `Range`
/// header; transient network failures are retried with linear backoff.
#[derive(Debug)]
pub struct HttpSource {
    /// HTTP client with connection pooling
    client: Client,
    /// The URL of the remote archive
    url: String,
    /// Total size of the remote resource in bytes
    size: u64,
    /// Number of range GETs issued (including retries)
    requests: AtomicU64,
    /// Cumulative bytes received from the network
    transferred: AtomicU64,
    /// Maximum number of attempts for a failed request
    max_retry: u32,
}

impl HttpSource {
    pub async fn new(url: String) -> ZipResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(request_error)?;

        let resp = client.head(&url).send().await.map_err(request_error)?;
        if !resp.status().is_success() {
            return Err(status_error(resp.status()));
        }

        let accept_ranges = resp
            .headers()
            .get("accept-ranges")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("none");
        if !accept_ranges.contains("bytes") {
            return Err(ZipError::Io(io::Error::other(
                "remote server does not support Range requests",
            )));
        }

        let size = resp
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| {
                ZipError::Io(io::Error::other(
                    "remote server did not return Content-Length",
                ))
            })?;

        Ok(Self {
            client,
            url,
            size,
            requests: AtomicU64::new(0),
            transferred: AtomicU64::new(0),
            max_retry: 10,
        })
    }

    /// Total size of the remote resource, from the HEAD preflight.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Number of range GETs issued so far.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Cumulative bytes received from the network.
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred.load(Ordering::Relaxed)
    }

    /// Issue `GET` with `Range: bytes=<spec>`, retrying transient errors.
    async fn get_range(&self, spec: &str) -> ZipResult<Response> {
        let mut retry_count = 0u32;
        loop {
            self.requests.fetch_add(1, Ordering::Relaxed);
            let result = self
                .client
                .get(&self.url)
                .header("Range", format!("bytes={spec}"))
                .send()
                .await;

            match result {
                Ok(resp) => {
                    if !resp.status().is_success() {
                        return Err(status_error(resp.status()));
                    }
                    return Ok(resp);
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    retry_count += 1;
                    if retry_count >= self.max_retry {
                        return Err(request_error(e));
                    }
                    tokio::time::sleep(Duration::from_millis(500 * retry_count as u64)).await;
                }
                Err(e) => return Err(request_error(e)),
            }
        }
    }

    async fn body(&self, resp: Response) -> ZipResult<Bytes> {
        let bytes = resp.bytes().await.map_err(request_error)?;
        self.transferred
            .fetch_add(bytes.len() as u64, Ordering::Relaxed);
        Ok(bytes)
    }
}

#[async_trait]
impl RangeSource for HttpSource {
    async fn read(&self, range: ByteRange) -> ZipResult<Bytes> {
        let resp = self.get_range(&range.to_string()).await?;
        let status = resp.status();
        let body = self.body(resp).await?;

        // A 200 response carries the whole resource; slice out the window.
        let part = if status == StatusCode::OK && body.len() as u64 > range.length {
            let start = range.start as usize;
            let end = range.end() as usize;
            if body.len() < end {
                return Err(ZipError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("response body ends before requested range {range}"),
                )));
            }
            body.slice(start..end)
        } else {
            body
        };

        if part.len() as u64 != range.length {
            return Err(ZipError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "server returned {} bytes for range {} ({} expected)",
                    part.len(),
                    range,
                    range.length
                ),
            )));
        }
        Ok(part)
    }

    async fn read_many(&self, ranges: &[ByteRange]) -> ZipResult<Vec<Bytes>> {
        match ranges {
            [] => Ok(Vec::new()),
            [single] => Ok(vec![self.read(*single).await?]),
            _ => {
                let spec = ranges
                    .iter()
                    .map(ByteRange::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                let resp = self.get_range(&spec).await?;

                let content_type = resp
                    .headers()
                    .get("content-type")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                let boundary = multipart::boundary_param(&content_type).ok_or_else(|| {
                    ZipError::Io(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!(
                            "expected multipart/byteranges response, got {:?}",
                            content_type
                        ),
                    ))
                })?;

                let body = self.body(resp).await?;
                let parts = multipart::split_parts(&body, &boundary)?;

                // The server is trusted to answer in request order; a
                // partial answer is fatal.
                if parts.len() != ranges.len() {
                    return Err(ZipError::Io(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!(
                            "server returned {} parts for {} requested ranges",
                            parts.len(),
                            ranges.len()
                        ),
                    )));
                }
                for (part, range) in parts.iter().zip(ranges) {
                    if part.len() as u64 != range.length {
                        return Err(ZipError::Io(io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!(
                                "part holds {} bytes but range {} asked for {}",
                                part.len(),
                                range,
                                range.length
                            ),
                        )));
                    }
                }
                Ok(parts)
            }
        }
    }

    async fn read_tail(&self, length: u64) -> ZipResult<Bytes> {
        let resp = self.get_range(&format!("-{length}")).await?;
        let body = self.body(resp).await?;

        if (body.len() as u64) < length {
            return Err(ZipError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "unexpected end of resource: tail of {} bytes requested, {} received",
                    length,
                    body.len()
                ),
            )));
        }
        // A 200 response (or a suffix longer than asked) still ends with
        // the bytes we want.
        Ok(body.slice(body.len() - length as usize..))
    }

    async fn close(&self) -> ZipResult<()> {
        Ok(())
    }
}
