//! Reader for `multipart/byteranges` response bodies.
//!
//! Splits a multipart body into an ordered list of opaque byte parts. Each
//! part's body is the raw bytes of one requested range; the per-part
//! headers (`Content-Type`, `Content-Range`) are discarded. The boundary
//! comes from the `Content-Type` parameter of the response.

use std::io;

use bytes::Bytes;

const CRLF: &[u8] = b"\r\n";

/// Extract the `boundary` parameter from a `multipart/byteranges`
/// Content-Type value. Returns `None` for any other media type.
pub(crate) fn boundary_param(content_type: &str) -> Option<String> {
    let mut params = content_type.split(';').map(str::trim);
    if !params
        .next()?
        .eq_ignore_ascii_case("multipart/byteranges")
    {
        return None;
    }
    params
        .find_map(|p| p.strip_prefix("boundary="))
        .map(|b| b.trim_matches('"').to_string())
        .filter(|b| !b.is_empty())
}

fn malformed(detail: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("malformed multipart/byteranges body: {detail}"),
    )
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}

/// Split `body` into its parts, in server order.
///
/// The grammar accepted here is the RFC 2046 shape servers actually emit:
/// an optional preamble, then for each part a `--boundary` delimiter line,
/// headers terminated by an empty line, and the part body running up to
/// the next delimiter. The final delimiter carries a trailing `--`.
pub(crate) fn split_parts(body: &Bytes, boundary: &str) -> io::Result<Vec<Bytes>> {
    let delimiter = format!("--{boundary}").into_bytes();
    let mut parts = Vec::new();

    let mut pos = find(body, &delimiter, 0).ok_or_else(|| malformed("boundary not found"))?;

    loop {
        pos += delimiter.len();

        // Closing delimiter: "--boundary--".
        if body[pos..].starts_with(b"--") {
            return Ok(parts);
        }
        if !body[pos..].starts_with(CRLF) {
            return Err(malformed("boundary line not terminated"));
        }
        pos += CRLF.len();

        // Per-part headers are discarded; an empty line ends them.
        let headers_end =
            find(body, b"\r\n\r\n", pos).ok_or_else(|| malformed("part headers not terminated"))?;
        let data_start = headers_end + 4;

        // The part body runs to the CRLF preceding the next delimiter.
        let mut next = Vec::with_capacity(2 + delimiter.len());
        next.extend_from_slice(CRLF);
        next.extend_from_slice(&delimiter);
        let data_end = find(body, &next, data_start).ok_or_else(|| malformed("truncated part"))?;

        parts.push(body.slice(data_start..data_end));
        pos = data_end + CRLF.len();
    }
}
