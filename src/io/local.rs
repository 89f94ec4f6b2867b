use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use super::{ByteRange, RangeSource};
use crate::error::ZipResult;

/// Seekable read-only file source with random access support.
pub struct FileSource {
    file: RwLock<Option<File>>,
    size: u64,
}

impl FileSource {
    /// Open `path` read-only. Fails with the underlying not-found or
    /// permission error.
    pub fn open(path: impl AsRef<Path>) -> ZipResult<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            file: RwLock::new(Some(file)),
            size,
        })
    }

    /// Total size of the file in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let guard = self.file.read().unwrap_or_else(|e| e.into_inner());
        let file = guard
            .as_ref()
            .ok_or_else(|| io::Error::other("file source is closed"))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            file.read_exact_at(buf, offset)
        }

        #[cfg(windows)]
        {
            use std::os::windows::fs::FileExt;
            let mut filled = 0;
            while filled < buf.len() {
                let n = file.seek_read(&mut buf[filled..], offset + filled as u64)?;
                if n == 0 {
                    return Err(io::ErrorKind::UnexpectedEof.into());
                }
                filled += n;
            }
            Ok(())
        }

        #[cfg(not(any(unix, windows)))]
        {
            use std::io::{Read, Seek, SeekFrom};
            let mut file = file;
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(buf)
        }
    }
}

#[async_trait]
impl RangeSource for FileSource {
    async fn read(&self, range: ByteRange) -> ZipResult<Bytes> {
        if range.end() > self.size {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("range {} reaches past end of file ({})", range, self.size),
            )
            .into());
        }

        let mut buf = vec![0u8; range.length as usize];
        self.read_exact_at(range.start, &mut buf)?;
        Ok(Bytes::from(buf))
    }

    async fn read_many(&self, ranges: &[ByteRange]) -> ZipResult<Vec<Bytes>> {
        let mut parts = Vec::with_capacity(ranges.len());
        for range in ranges {
            parts.push(self.read(*range).await?);
        }
        Ok(parts)
    }

    async fn read_tail(&self, length: u64) -> ZipResult<Bytes> {
        if length > self.size {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "unexpected end of file: tail of {} bytes requested from {}",
                    length, self.size
                ),
            )
            .into());
        }
        self.read(ByteRange::new(self.size - length, length)).await
    }

    async fn close(&self) -> ZipResult<()> {
        let mut guard = self.file.write().unwrap_or_else(|e| e.into_inner());
        guard.take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn temp_source(contents: &[u8]) -> (tempfile::NamedTempFile, FileSource) {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents).expect("write");
        let source = FileSource::open(file.path()).expect("open");
        (file, source)
    }

    #[tokio::test]
    async fn reads_exact_ranges() {
        let (_guard, source) = temp_source(b"hello, random access");
        let part = source.read(ByteRange::new(7, 6)).await.unwrap();
        assert_eq!(&part[..], b"random");
    }

    #[tokio::test]
    async fn read_many_preserves_input_order() {
        let (_guard, source) = temp_source(b"0123456789");
        let parts = source
            .read_many(&[ByteRange::new(8, 2), ByteRange::new(0, 3)])
            .await
            .unwrap();
        assert_eq!(&parts[0][..], b"89");
        assert_eq!(&parts[1][..], b"012");
    }

    #[tokio::test]
    async fn read_tail_returns_final_bytes() {
        let (_guard, source) = temp_source(b"0123456789");
        let tail = source.read_tail(4).await.unwrap();
        assert_eq!(&tail[..], b"6789");
    }

    #[tokio::test]
    async fn oversized_tail_is_unexpected_eof() {
        let (_guard, source) = temp_source(b"tiny");
        let err = source.read_tail(64).await.unwrap_err();
        assert!(err.to_string().contains("unexpected end"));
    }

    #[tokio::test]
    async fn read_past_end_fails() {
        let (_guard, source) = temp_source(b"tiny");
        assert!(source.read(ByteRange::new(2, 10)).await.is_err());
    }

    #[tokio::test]
    async fn read_after_close_fails() {
        let (_guard, source) = temp_source(b"0123456789");
        source.close().await.unwrap();
        assert!(source.read(ByteRange::new(0, 1)).await.is_err());
    }

    #[tokio::test]
    async fn missing_file_fails_at_open() {
        assert!(FileSource::open("/definitely/not/here.zip").is_err());
    }
}
