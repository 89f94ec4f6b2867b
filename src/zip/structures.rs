//! ZIP record structures and their parsers.
//!
//! All records are little-endian. Each parser is a pure function from a
//! byte cursor to a typed record; validation failures become a
//! [`RecordError`] naming the failed field, buffer underflow is classified
//! `Incomplete`, and any other failure `Unknown`.

use std::collections::HashMap;
use std::io::{self, Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use chrono::{DateTime, TimeZone, Utc};

use crate::error::RecordError;
use crate::io::ByteRange;

/// Data descriptor present (CRC and sizes trail the payload).
pub const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;
/// File name and comment are UTF-8.
pub const FLAG_UTF8: u16 = 1 << 11;
/// Bits 0 (encryption), 6 (strong encryption), 12-15 (reserved/masked):
/// any of these set makes the entry unreadable for us.
pub const UNSUPPORTED_FLAGS: u16 = 0x0001 | 0x0040 | 0xF000;

const SUPPORTED_VERSIONS: [u16; 2] = [20, 45];

/// Fixed-width integer whose all-ones value marks "look in the ZIP64
/// record instead".
pub(crate) trait Sentinel: Copy + Eq {
    const SENTINEL: Self;
}

impl Sentinel for u16 {
    const SENTINEL: Self = u16::MAX;
}

impl Sentinel for u32 {
    const SENTINEL: Self = u32::MAX;
}

pub(crate) fn is_sentinel<T: Sentinel>(value: T) -> bool {
    value == T::SENTINEL
}

/// ZIP compression methods supported by this reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
}

impl CompressionMethod {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(CompressionMethod::Stored),
            8 => Some(CompressionMethod::Deflate),
            _ => None,
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
        }
    }
}

/// Decode an MS-DOS date/time pair (2-second resolution) to UTC.
pub(crate) fn dos_datetime(date: u16, time: u16) -> DateTime<Utc> {
    let year = ((date >> 9) & 0x7F) as i32 + 1980;
    let month = ((date >> 5) & 0x0F) as u32;
    let day = (date & 0x1F) as u32;
    let hour = ((time >> 11) & 0x1F) as u32;
    let minute = ((time >> 5) & 0x3F) as u32;
    let second = ((time & 0x1F) as u32) * 2;

    Utc.with_ymd_and_hms(year, month, day, hour, minute, second)
        .single()
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Cursor wrapper that turns underflow into `Incomplete` record errors.
struct RecordCursor<'c, 'a> {
    record: &'static str,
    cur: &'c mut Cursor<&'a [u8]>,
}

impl<'c, 'a> RecordCursor<'c, 'a> {
    fn new(record: &'static str, cur: &'c mut Cursor<&'a [u8]>) -> Self {
        Self { record, cur }
    }

    fn u8(&mut self) -> Result<u8, RecordError> {
        self.cur
            .read_u8()
            .map_err(|e| RecordError::incomplete(self.record, e))
    }

    fn u16(&mut self) -> Result<u16, RecordError> {
        self.cur
            .read_u16::<LittleEndian>()
            .map_err(|e| RecordError::incomplete(self.record, e))
    }

    fn u32(&mut self) -> Result<u32, RecordError> {
        self.cur
            .read_u32::<LittleEndian>()
            .map_err(|e| RecordError::incomplete(self.record, e))
    }

    fn u64(&mut self) -> Result<u64, RecordError> {
        self.cur
            .read_u64::<LittleEndian>()
            .map_err(|e| RecordError::incomplete(self.record, e))
    }

    fn bytes(&mut self, len: usize) -> Result<Vec<u8>, RecordError> {
        let mut buf = vec![0u8; len];
        self.cur
            .read_exact(&mut buf)
            .map_err(|e| RecordError::incomplete(self.record, e))?;
        Ok(buf)
    }

    fn remaining(&self) -> usize {
        let total = self.cur.get_ref().len() as u64;
        total.saturating_sub(self.cur.position()) as usize
    }
}

fn decode_name(record: &'static str, raw: Vec<u8>, utf8: bool) -> Result<String, RecordError> {
    if utf8 {
        String::from_utf8(raw).map_err(|e| RecordError::unknown(record, e))
    } else {
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }
}

/// Normalized End of Central Directory values, produced by both the ZIP32
/// and the ZIP64 parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    pub entry_count: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
    pub is_zip64: bool,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE_ZIP32: u32 = 0x06054B50;
    pub const SIGNATURE_ZIP64: u32 = 0x06064B50;
    /// Fixed size of the ZIP32 form, excluding the comment tail.
    pub const SIZE_ZIP32: usize = 22;
    /// Fixed size of the ZIP64 form, excluding the extensible data sector.
    pub const SIZE_ZIP64: usize = 56;

    const RECORD_ZIP32: &'static str = "End of Central Directory";
    const RECORD_ZIP64: &'static str = "ZIP64 End of Central Directory";

    /// Parse the 22-byte ZIP32 form.
    ///
    /// Sentinel values in the disk, entry-count, size, or offset fields
    /// set `is_zip64`; the true values then live in the ZIP64 record.
    pub fn parse_zip32(data: &[u8]) -> Result<Self, RecordError> {
        const RECORD: &str = EndOfCentralDirectory::RECORD_ZIP32;
        let mut cur = Cursor::new(data);
        let mut cur = RecordCursor::new(RECORD, &mut cur);

        let signature = cur.u32()?;
        if signature != Self::SIGNATURE_ZIP32 {
            return Err(RecordError::field(
                RECORD,
                format!("invalid signature: {signature:#010x}"),
            ));
        }

        let disk_number = cur.u16()?;
        if disk_number != 0 && !is_sentinel(disk_number) {
            return Err(RecordError::field(
                RECORD,
                format!("invalid disk number: {disk_number}"),
            ));
        }
        let start_disk = cur.u16()?;
        if start_disk != disk_number {
            return Err(RecordError::field(
                RECORD,
                format!("invalid start disk number: {start_disk}"),
            ));
        }
        let entries_on_disk = cur.u16()?;
        let entry_count = cur.u16()?;
        if entries_on_disk != entry_count {
            return Err(RecordError::field(
                RECORD,
                format!("invalid entries in CD disk: {entries_on_disk}"),
            ));
        }
        let cd_size = cur.u32()?;
        let cd_offset = cur.u32()?;
        let _comment_len = cur.u16()?;

        let is_zip64 = is_sentinel(disk_number)
            || is_sentinel(start_disk)
            || is_sentinel(entries_on_disk)
            || is_sentinel(entry_count)
            || is_sentinel(cd_size)
            || is_sentinel(cd_offset);

        if is_zip64 {
            if cd_size != 0 && !is_sentinel(cd_size) {
                return Err(RecordError::field(
                    RECORD,
                    format!("invalid size of CD: {cd_size}"),
                ));
            }
            if cd_offset != 0 && !is_sentinel(cd_offset) {
                return Err(RecordError::field(
                    RECORD,
                    format!("invalid offset of CD: {cd_offset}"),
                ));
            }
            if entry_count != 0 && !is_sentinel(entry_count) {
                return Err(RecordError::field(
                    RECORD,
                    format!("invalid entries in CD: {entry_count}"),
                ));
            }
        }

        Ok(Self {
            entry_count: entry_count as u64,
            cd_size: cd_size as u64,
            cd_offset: cd_offset as u64,
            is_zip64,
        })
    }

    /// Parse the 56-byte ZIP64 form.
    pub fn parse_zip64(data: &[u8]) -> Result<Self, RecordError> {
        const RECORD: &str = EndOfCentralDirectory::RECORD_ZIP64;
        let mut cur = Cursor::new(data);
        let mut cur = RecordCursor::new(RECORD, &mut cur);

        let signature = cur.u32()?;
        if signature != Self::SIGNATURE_ZIP64 {
            return Err(RecordError::field(
                RECORD,
                format!("invalid signature: {signature:#010x}"),
            ));
        }

        // The size field excludes the signature and itself.
        let record_size = cur.u64()?;
        let expected = (Self::SIZE_ZIP64 - 12) as u64;
        if record_size != expected {
            return Err(RecordError::field(
                RECORD,
                format!("invalid size: {record_size} (expected {expected})"),
            ));
        }
        let _version_made_by = cur.u16()?;
        let version_needed = cur.u16()?;
        if version_needed != 45 {
            return Err(RecordError::field(
                RECORD,
                format!("invalid version needed: {version_needed}"),
            ));
        }
        let disk_number = cur.u32()?;
        if disk_number != 0 {
            return Err(RecordError::field(
                RECORD,
                format!("invalid disk number: {disk_number}"),
            ));
        }
        let start_disk = cur.u32()?;
        if start_disk != 0 {
            return Err(RecordError::field(
                RECORD,
                format!("invalid start disk number: {start_disk}"),
            ));
        }
        let entries_on_disk = cur.u64()?;
        let entry_count = cur.u64()?;
        if entries_on_disk != entry_count {
            return Err(RecordError::field(
                RECORD,
                format!("invalid entries in CD: {entries_on_disk} on disk, {entry_count} total"),
            ));
        }
        let cd_size = cur.u64()?;
        let cd_offset = cur.u64()?;

        Ok(Self {
            entry_count,
            cd_size,
            cd_offset,
            is_zip64: true,
        })
    }
}

/// ZIP64 End of Central Directory Locator.
#[derive(Debug, Clone, Copy)]
pub struct Zip64Locator {
    /// Absolute offset of the ZIP64 EOCD record.
    pub eocd_offset: u64,
}

impl Zip64Locator {
    pub const SIGNATURE: u32 = 0x07064B50;
    pub const SIZE: usize = 20;

    const RECORD: &'static str = "ZIP64 End of Central Directory Locator";

    pub fn parse(data: &[u8]) -> Result<Self, RecordError> {
        const RECORD: &str = Zip64Locator::RECORD;
        let mut cur = Cursor::new(data);
        let mut cur = RecordCursor::new(RECORD, &mut cur);

        let signature = cur.u32()?;
        if signature != Self::SIGNATURE {
            return Err(RecordError::field(
                RECORD,
                format!("invalid signature: {signature:#010x}"),
            ));
        }
        let start_disk = cur.u32()?;
        if start_disk != 0 {
            return Err(RecordError::field(
                RECORD,
                format!("invalid start disk: {start_disk}"),
            ));
        }
        let eocd_offset = cur.u64()?;
        let total_disks = cur.u32()?;
        if total_disks != 1 {
            return Err(RecordError::field(
                RECORD,
                format!("invalid total disks: {total_disks}"),
            ));
        }

        Ok(Self { eocd_offset })
    }
}

/// ZIP64 extended information extra field (header ID `0x0001`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zip64ExtraInfo {
    pub uncompressed_size: u64,
    pub compressed_size: u64,
    pub local_header_offset: u64,
}

impl Zip64ExtraInfo {
    const RECORD: &'static str = "ZIP64 extended information";

    pub fn parse(payload: &[u8]) -> Result<Self, RecordError> {
        const RECORD: &str = Zip64ExtraInfo::RECORD;
        let mut cur = Cursor::new(payload);
        let mut cur = RecordCursor::new(RECORD, &mut cur);

        let uncompressed_size = cur.u64()?;
        let compressed_size = cur.u64()?;
        let local_header_offset = cur.u64()?;
        let start_disk = cur.u32()?;
        if start_disk != 0 {
            return Err(RecordError::field(
                RECORD,
                format!("invalid start disk: {start_disk}"),
            ));
        }

        Ok(Self {
            uncompressed_size,
            compressed_size,
            local_header_offset,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(28);
        out.extend_from_slice(&self.uncompressed_size.to_le_bytes());
        out.extend_from_slice(&self.compressed_size.to_le_bytes());
        out.extend_from_slice(&self.local_header_offset.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out
    }
}

/// Extended timestamp extra field (header ID `0x5455`).
///
/// The flag byte announces which of modify/access/create are stored; a
/// flagged time is only present while the payload still has room for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedTimestamp {
    pub flags: u8,
    pub modified: Option<u32>,
    pub accessed: Option<u32>,
    pub created: Option<u32>,
}

impl ExtendedTimestamp {
    pub const FLAG_MODIFIED: u8 = 0x01;
    pub const FLAG_ACCESSED: u8 = 0x02;
    pub const FLAG_CREATED: u8 = 0x04;

    const RECORD: &'static str = "extended timestamp";

    pub fn parse(payload: &[u8]) -> Result<Self, RecordError> {
        const RECORD: &str = ExtendedTimestamp::RECORD;
        let mut cur = Cursor::new(payload);
        let mut cur = RecordCursor::new(RECORD, &mut cur);

        let flags = cur.u8()?;
        let mut time = |flag: u8| -> Result<Option<u32>, RecordError> {
            if flags & flag != 0 && cur.remaining() >= 4 {
                Ok(Some(cur.u32()?))
            } else {
                Ok(None)
            }
        };
        let modified = time(Self::FLAG_MODIFIED)?;
        let accessed = time(Self::FLAG_ACCESSED)?;
        let created = time(Self::FLAG_CREATED)?;

        Ok(Self {
            flags,
            modified,
            accessed,
            created,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![self.flags];
        for time in [self.modified, self.accessed, self.created]
            .into_iter()
            .flatten()
        {
            out.extend_from_slice(&time.to_le_bytes());
        }
        out
    }
}

/// One field of an extra-field block, dispatched by its 16-bit header ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtraField {
    Zip64(Zip64ExtraInfo),
    Timestamp(ExtendedTimestamp),
    Generic { header_id: u16, data: Vec<u8> },
}

impl ExtraField {
    pub const ZIP64_ID: u16 = 0x0001;
    pub const TIMESTAMP_ID: u16 = 0x5455;

    const RECORD: &'static str = "extra field";

    /// Decode a whole extra-field block into its typed fields.
    pub fn parse_all(data: &[u8]) -> Result<Vec<ExtraField>, RecordError> {
        const RECORD: &str = ExtraField::RECORD;
        let mut cur = Cursor::new(data);
        let mut fields = Vec::new();

        while (cur.position() as usize) < data.len() {
            let mut head = RecordCursor::new(RECORD, &mut cur);
            let header_id = head.u16()?;
            let length = head.u16()? as usize;

            let start = cur.position() as usize;
            let end = start + length;
            if end > data.len() {
                return Err(RecordError::incomplete(
                    RECORD,
                    io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("field {header_id:#06x} declares {length} payload bytes"),
                    ),
                ));
            }
            let payload = &data[start..end];
            cur.set_position(end as u64);

            fields.push(match header_id {
                Self::ZIP64_ID => ExtraField::Zip64(Zip64ExtraInfo::parse(payload)?),
                Self::TIMESTAMP_ID => ExtraField::Timestamp(ExtendedTimestamp::parse(payload)?),
                _ => ExtraField::Generic {
                    header_id,
                    data: payload.to_vec(),
                },
            });
        }

        Ok(fields)
    }

    pub fn header_id(&self) -> u16 {
        match self {
            ExtraField::Zip64(_) => Self::ZIP64_ID,
            ExtraField::Timestamp(_) => Self::TIMESTAMP_ID,
            ExtraField::Generic { header_id, .. } => *header_id,
        }
    }

    /// Serialize back to the wire layout, 4-byte header included.
    pub fn to_bytes(&self) -> Vec<u8> {
        let payload = match self {
            ExtraField::Zip64(info) => info.to_bytes(),
            ExtraField::Timestamp(ts) => ts.to_bytes(),
            ExtraField::Generic { data, .. } => data.clone(),
        };
        let mut out = Vec::with_capacity(4 + payload.len());
        out.extend_from_slice(&self.header_id().to_le_bytes());
        out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        out.extend_from_slice(&payload);
        out
    }
}

/// A Central Directory entry: the archive-side record of one file.
///
/// Immutable after construction. Sizes and the local-header offset
/// already reflect the ZIP64 extended values when the 32-bit header
/// fields held sentinels.
#[derive(Debug, Clone)]
pub struct ZipFileEntry {
    pub file_name: String,
    pub file_comment: String,
    pub compression_method: CompressionMethod,
    pub bit_flags: u16,
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub local_header_offset: u64,
    pub last_modified: DateTime<Utc>,
    pub last_access: Option<DateTime<Utc>>,
    pub created: Option<DateTime<Utc>>,
    pub is_directory: bool,
    /// Raw byte length of the name field as stored in the archive.
    pub(crate) file_name_len: u16,
}

impl ZipFileEntry {
    pub const SIGNATURE: u32 = 0x02014B50;

    const RECORD: &'static str = "Central File Header";

    pub fn is_data_descriptor(&self) -> bool {
        self.bit_flags & FLAG_DATA_DESCRIPTOR != 0
    }

    pub fn is_utf8_name(&self) -> bool {
        self.bit_flags & FLAG_UTF8 != 0
    }

    /// Byte range of the entry's local header plus compressed payload.
    /// The trailing data descriptor, if any, is excluded.
    pub(crate) fn local_range(&self) -> ByteRange {
        let length =
            LocalFileHeader::SIZE as u64 + self.file_name_len as u64 + self.compressed_size;
        ByteRange::new(self.local_header_offset, length)
    }

    /// Parse one Central File Header, leaving the cursor at the next one.
    pub fn parse(cur: &mut Cursor<&[u8]>) -> Result<Self, RecordError> {
        const RECORD: &str = ZipFileEntry::RECORD;
        let mut rc = RecordCursor::new(RECORD, cur);

        let signature = rc.u32()?;
        if signature != Self::SIGNATURE {
            return Err(RecordError::field(
                RECORD,
                format!("invalid signature: {signature:#010x}"),
            ));
        }
        let _version_made_by = rc.u16()?;
        let version_needed = rc.u16()?;
        if !SUPPORTED_VERSIONS.contains(&version_needed) {
            return Err(RecordError::field(
                RECORD,
                format!("invalid version needed: {version_needed}"),
            ));
        }
        let bit_flags = rc.u16()?;
        if bit_flags & UNSUPPORTED_FLAGS != 0 {
            return Err(RecordError::field(
                RECORD,
                format!("invalid bit flags: {bit_flags:#06x}"),
            ));
        }
        let method_code = rc.u16()?;
        let compression_method = CompressionMethod::from_code(method_code).ok_or_else(|| {
            RecordError::field(RECORD, format!("invalid compression method: {method_code}"))
        })?;
        let mod_time = rc.u16()?;
        let mod_date = rc.u16()?;
        let crc32 = rc.u32()?;
        let compressed_size32 = rc.u32()?;
        let uncompressed_size32 = rc.u32()?;
        let file_name_len = rc.u16()?;
        if file_name_len == 0 {
            return Err(RecordError::field(RECORD, "invalid file name length: 0"));
        }
        let extra_field_len = rc.u16()?;
        let comment_len = rc.u16()?;
        let start_disk = rc.u16()?;
        if start_disk != 0 {
            return Err(RecordError::field(
                RECORD,
                format!("invalid start disk: {start_disk}"),
            ));
        }
        let _internal_attrs = rc.u16()?;
        let _external_attrs = rc.u32()?;
        let local_header_offset32 = rc.u32()?;

        let raw_name = rc.bytes(file_name_len as usize)?;
        let file_name = decode_name(RECORD, raw_name, bit_flags & FLAG_UTF8 != 0)?;
        let is_directory = file_name.ends_with('/');

        if bit_flags & FLAG_DATA_DESCRIPTOR != 0 && !is_directory && crc32 == 0 {
            return Err(RecordError::field(
                RECORD,
                "invalid CRC32: 0 with data descriptor",
            ));
        }

        let mut compressed_size = compressed_size32 as u64;
        let mut uncompressed_size = uncompressed_size32 as u64;
        let mut local_header_offset = local_header_offset32 as u64;
        let mut last_modified = dos_datetime(mod_date, mod_time);
        let mut last_access = None;
        let mut created = None;

        let extra_data = rc.bytes(extra_field_len as usize)?;
        for field in ExtraField::parse_all(&extra_data)? {
            match field {
                ExtraField::Zip64(info) => {
                    compressed_size = info.compressed_size;
                    uncompressed_size = info.uncompressed_size;
                    local_header_offset = info.local_header_offset;
                }
                ExtraField::Timestamp(ts) => {
                    if let Some(secs) = ts.modified {
                        if let Some(dt) = DateTime::from_timestamp(secs as i64, 0) {
                            last_modified = dt;
                        }
                    }
                    last_access = ts.accessed.and_then(|s| DateTime::from_timestamp(s as i64, 0));
                    created = ts.created.and_then(|s| DateTime::from_timestamp(s as i64, 0));
                }
                ExtraField::Generic { .. } => {}
            }
        }

        let raw_comment = rc.bytes(comment_len as usize)?;
        let file_comment = String::from_utf8_lossy(&raw_comment).into_owned();

        Ok(Self {
            file_name,
            file_comment,
            compression_method,
            bit_flags,
            crc32,
            compressed_size,
            uncompressed_size,
            local_header_offset,
            last_modified,
            last_access,
            created,
            is_directory,
            file_name_len,
        })
    }
}

/// Entry facts surfaced to consumers.
#[derive(Debug, Clone)]
pub struct EntryMetadata {
    pub name: String,
    pub last_modified: DateTime<Utc>,
    pub last_access: Option<DateTime<Utc>>,
    pub created: Option<DateTime<Utc>>,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
}

impl From<&ZipFileEntry> for EntryMetadata {
    fn from(entry: &ZipFileEntry) -> Self {
        Self {
            name: entry.file_name.clone(),
            last_modified: entry.last_modified,
            last_access: entry.last_access,
            created: entry.created,
            compressed_size: entry.compressed_size,
            uncompressed_size: entry.uncompressed_size,
            crc32: entry.crc32,
        }
    }
}

/// A Local File Header, parsed at extraction time and cross-validated
/// against the Central Directory entry of the same name.
///
/// For data-descriptor entries the header stores zero CRC and sizes; the
/// values here are already substituted from the Central Directory.
#[derive(Debug, Clone)]
pub struct LocalFileHeader {
    pub file_name: String,
    pub compression_method: CompressionMethod,
    pub bit_flags: u16,
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
}

impl LocalFileHeader {
    pub const SIGNATURE: u32 = 0x04034B50;
    pub const SIZE: usize = 30;

    const RECORD: &'static str = "Local File Header";

    pub fn parse(
        cur: &mut Cursor<&[u8]>,
        directory: &HashMap<String, ZipFileEntry>,
    ) -> Result<Self, RecordError> {
        const RECORD: &str = LocalFileHeader::RECORD;
        let mut rc = RecordCursor::new(RECORD, cur);

        let signature = rc.u32()?;
        if signature != Self::SIGNATURE {
            return Err(RecordError::field(
                RECORD,
                format!("invalid signature: {signature:#010x}"),
            ));
        }
        let version_needed = rc.u16()?;
        if !SUPPORTED_VERSIONS.contains(&version_needed) {
            return Err(RecordError::field(
                RECORD,
                format!("invalid version needed: {version_needed}"),
            ));
        }
        let bit_flags = rc.u16()?;
        if bit_flags & UNSUPPORTED_FLAGS != 0 {
            return Err(RecordError::field(
                RECORD,
                format!("invalid bit flags: {bit_flags:#06x}"),
            ));
        }
        let method_code = rc.u16()?;
        let compression_method = CompressionMethod::from_code(method_code).ok_or_else(|| {
            RecordError::field(RECORD, format!("invalid compression method: {method_code}"))
        })?;
        let _mod_time = rc.u16()?;
        let _mod_date = rc.u16()?;
        let crc32 = rc.u32()?;
        let compressed_size32 = rc.u32()?;
        let uncompressed_size32 = rc.u32()?;
        let file_name_len = rc.u16()?;
        if file_name_len == 0 {
            return Err(RecordError::field(RECORD, "invalid file name length: 0"));
        }
        let extra_field_len = rc.u16()?;
        if extra_field_len != 0 {
            return Err(RecordError::field(
                RECORD,
                format!("invalid extra field length: {extra_field_len}"),
            ));
        }

        let raw_name = rc.bytes(file_name_len as usize)?;
        let file_name = decode_name(RECORD, raw_name, bit_flags & FLAG_UTF8 != 0)?;

        let entry = directory.get(&file_name).ok_or_else(|| {
            RecordError::field(
                RECORD,
                format!("file {file_name:?} not present in the Central Directory"),
            )
        })?;

        let is_data_descriptor = bit_flags & FLAG_DATA_DESCRIPTOR != 0;
        if is_data_descriptor != entry.is_data_descriptor() {
            return Err(RecordError::field(
                RECORD,
                "bit flags do not agree with the Central Directory entry",
            ));
        }

        let (crc32, compressed_size, uncompressed_size) = if is_data_descriptor {
            // The real values trail the payload; the header must hold
            // zeros and the Central Directory supplies the truth.
            if crc32 != 0 {
                return Err(RecordError::field(
                    RECORD,
                    format!("invalid CRC32: {crc32:#010x} with data descriptor"),
                ));
            }
            if compressed_size32 != 0 || uncompressed_size32 != 0 {
                return Err(RecordError::field(
                    RECORD,
                    "invalid sizes: nonzero with data descriptor",
                ));
            }
            (entry.crc32, entry.compressed_size, entry.uncompressed_size)
        } else {
            if compressed_size32 as u64 != entry.compressed_size
                || uncompressed_size32 as u64 != entry.uncompressed_size
            {
                return Err(RecordError::field(
                    RECORD,
                    "sizes do not agree with the Central Directory entry",
                ));
            }
            if crc32 != entry.crc32 {
                return Err(RecordError::field(
                    RECORD,
                    "CRC32 does not agree with the Central Directory entry",
                ));
            }
            (crc32, compressed_size32 as u64, uncompressed_size32 as u64)
        };

        Ok(Self {
            file_name,
            compression_method,
            bit_flags,
            crc32,
            compressed_size,
            uncompressed_size,
        })
    }
}
