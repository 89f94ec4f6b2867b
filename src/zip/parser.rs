//! Central directory loader.
//!
//! ZIP archives are read from the end: the trailer names the central
//! directory, the directory names every entry. The whole scan costs one
//! tail read, at most one ZIP64 upgrade read, and one directory read,
//! which keeps it cheap over HTTP range requests.

use std::collections::HashMap;
use std::io::Cursor;

use crate::error::ZipResult;
use crate::io::{ByteRange, RangeSource};

use super::structures::{EndOfCentralDirectory, Zip64Locator, ZipFileEntry};

/// Loads the central directory from any [`RangeSource`].
pub struct ZipParser<'a, S: RangeSource> {
    source: &'a S,
}

impl<'a, S: RangeSource> ZipParser<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Locate and normalize the archive trailer.
    ///
    /// The tail read covers the ZIP32 EOCD and the slot where a ZIP64
    /// locator would sit right before it. When the ZIP32 record carries
    /// sentinel values, the locator is parsed from that slot and the
    /// ZIP64 EOCD it points at supplies the true values.
    pub async fn read_trailer(&self) -> ZipResult<EndOfCentralDirectory> {
        let tail_len = (EndOfCentralDirectory::SIZE_ZIP32 + Zip64Locator::SIZE) as u64;
        let tail = self.source.read_tail(tail_len).await?;

        let eocd = EndOfCentralDirectory::parse_zip32(&tail[Zip64Locator::SIZE..])?;
        if !eocd.is_zip64 {
            return Ok(eocd);
        }

        let locator = Zip64Locator::parse(&tail[..Zip64Locator::SIZE])?;
        let buf = self
            .source
            .read(ByteRange::new(
                locator.eocd_offset,
                EndOfCentralDirectory::SIZE_ZIP64 as u64,
            ))
            .await?;
        Ok(EndOfCentralDirectory::parse_zip64(&buf)?)
    }

    /// Materialize the directory map: one read spanning the whole
    /// central directory, decoded into `entry_count` consecutive entries.
    ///
    /// A name that appears twice keeps its later entry.
    pub async fn load_directory(&self) -> ZipResult<HashMap<String, ZipFileEntry>> {
        let trailer = self.read_trailer().await?;

        let cd = self
            .source
            .read(ByteRange::new(trailer.cd_offset, trailer.cd_size))
            .await?;

        let mut cursor = Cursor::new(&cd[..]);
        let mut entries = HashMap::with_capacity(trailer.entry_count as usize);
        for _ in 0..trailer.entry_count {
            let entry = ZipFileEntry::parse(&mut cursor)?;
            entries.insert(entry.file_name.clone(), entry);
        }

        Ok(entries)
    }
}
