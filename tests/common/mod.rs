#![allow(dead_code)]

//! Deterministic in-test archive builder.
//!
//! Emits ZIP32 or ZIP64 archives byte by byte, with fixed DOS timestamps
//! and explicit sizes, so tests can assert exact offsets and contents.
//! The ZIP64 form stores sentinel sizes/offsets in each central entry and
//! carries the true values in ZIP64 extended information fields, with the
//! matching EOCD64 + locator + sentinel EOCD32 trailer chain.

use std::io::Write;

use flate2::write::DeflateEncoder;
use flate2::Compression;

// 2024-06-15 10:40:20, within DOS 2-second resolution.
pub const DOS_DATE: u16 = ((2024 - 1980) << 9) | (6 << 5) | 15;
pub const DOS_TIME: u16 = (10 << 11) | (40 << 5) | (20 / 2);

const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;

pub struct EntrySpec {
    pub name: &'static str,
    pub payload: &'static [u8],
    pub deflate: bool,
    pub data_descriptor: bool,
    /// (modified, accessed, created) epoch seconds for an extended
    /// timestamp field on the central entry.
    pub timestamps: Option<(u32, Option<u32>, Option<u32>)>,
}

impl EntrySpec {
    pub fn stored(name: &'static str, payload: &'static [u8]) -> Self {
        Self {
            name,
            payload,
            deflate: false,
            data_descriptor: false,
            timestamps: None,
        }
    }

    pub fn deflated(name: &'static str, payload: &'static [u8]) -> Self {
        Self {
            deflate: true,
            ..Self::stored(name, payload)
        }
    }

    pub fn directory(name: &'static str) -> Self {
        assert!(name.ends_with('/'), "directory names end with a slash");
        Self::stored(name, b"")
    }

    pub fn with_data_descriptor(mut self) -> Self {
        self.data_descriptor = true;
        self
    }

    pub fn with_timestamps(
        mut self,
        modified: u32,
        accessed: Option<u32>,
        created: Option<u32>,
    ) -> Self {
        self.timestamps = Some((modified, accessed, created));
        self
    }

    fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }
}

pub fn crc32(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

fn deflate(payload: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(payload).expect("deflate entry payload");
    encoder.finish().expect("finish deflate stream")
}

fn timestamp_extra(modified: u32, accessed: Option<u32>, created: Option<u32>) -> Vec<u8> {
    let mut flags = 0x01u8;
    if accessed.is_some() {
        flags |= 0x02;
    }
    if created.is_some() {
        flags |= 0x04;
    }
    let mut payload = vec![flags];
    payload.extend_from_slice(&modified.to_le_bytes());
    if let Some(t) = accessed {
        payload.extend_from_slice(&t.to_le_bytes());
    }
    if let Some(t) = created {
        payload.extend_from_slice(&t.to_le_bytes());
    }

    let mut out = Vec::new();
    out.extend_from_slice(&0x5455u16.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    out.extend_from_slice(&payload);
    out
}

fn zip64_extra(uncompressed: u64, compressed: u64, offset: u64) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0x0001u16.to_le_bytes());
    out.extend_from_slice(&28u16.to_le_bytes());
    out.extend_from_slice(&uncompressed.to_le_bytes());
    out.extend_from_slice(&compressed.to_le_bytes());
    out.extend_from_slice(&offset.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out
}

/// Build archive bytes for `specs`, in order.
pub fn build_archive(specs: &[EntrySpec], zip64: bool) -> Vec<u8> {
    let version: u16 = if zip64 { 45 } else { 20 };
    let mut out = Vec::new();
    let mut cd = Vec::new();

    for spec in specs {
        let payload = if spec.is_dir() { &[][..] } else { spec.payload };
        let data = if spec.deflate {
            deflate(payload)
        } else {
            payload.to_vec()
        };
        let crc = if spec.is_dir() { 0 } else { crc32(payload) };
        let method: u16 = if spec.deflate { 8 } else { 0 };
        let mut flags: u16 = 0;
        if spec.data_descriptor {
            flags |= FLAG_DATA_DESCRIPTOR;
        }
        let offset = out.len() as u64;

        // Local file header, then payload, then (optionally) the data
        // descriptor the reader is expected to never touch.
        out.extend_from_slice(&0x04034B50u32.to_le_bytes());
        out.extend_from_slice(&version.to_le_bytes());
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(&method.to_le_bytes());
        out.extend_from_slice(&DOS_TIME.to_le_bytes());
        out.extend_from_slice(&DOS_DATE.to_le_bytes());
        if spec.data_descriptor {
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes());
        } else {
            out.extend_from_slice(&crc.to_le_bytes());
            out.extend_from_slice(&(data.len() as u32).to_le_bytes());
            out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        }
        out.extend_from_slice(&(spec.name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(spec.name.as_bytes());
        out.extend_from_slice(&data);
        if spec.data_descriptor {
            out.extend_from_slice(&0x08074B50u32.to_le_bytes());
            out.extend_from_slice(&crc.to_le_bytes());
            out.extend_from_slice(&(data.len() as u32).to_le_bytes());
            out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        }

        let mut extra = Vec::new();
        if zip64 {
            extra.extend_from_slice(&zip64_extra(
                payload.len() as u64,
                data.len() as u64,
                offset,
            ));
        }
        if let Some((modified, accessed, created)) = spec.timestamps {
            extra.extend_from_slice(&timestamp_extra(modified, accessed, created));
        }

        cd.extend_from_slice(&0x02014B50u32.to_le_bytes());
        cd.extend_from_slice(&version.to_le_bytes());
        cd.extend_from_slice(&version.to_le_bytes());
        cd.extend_from_slice(&flags.to_le_bytes());
        cd.extend_from_slice(&method.to_le_bytes());
        cd.extend_from_slice(&DOS_TIME.to_le_bytes());
        cd.extend_from_slice(&DOS_DATE.to_le_bytes());
        cd.extend_from_slice(&crc.to_le_bytes());
        if zip64 {
            cd.extend_from_slice(&0xFFFFFFFFu32.to_le_bytes());
            cd.extend_from_slice(&0xFFFFFFFFu32.to_le_bytes());
        } else {
            cd.extend_from_slice(&(data.len() as u32).to_le_bytes());
            cd.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        }
        cd.extend_from_slice(&(spec.name.len() as u16).to_le_bytes());
        cd.extend_from_slice(&(extra.len() as u16).to_le_bytes());
        cd.extend_from_slice(&0u16.to_le_bytes());
        cd.extend_from_slice(&0u16.to_le_bytes());
        cd.extend_from_slice(&0u16.to_le_bytes());
        cd.extend_from_slice(&0u32.to_le_bytes());
        if zip64 {
            cd.extend_from_slice(&0xFFFFFFFFu32.to_le_bytes());
        } else {
            cd.extend_from_slice(&(offset as u32).to_le_bytes());
        }
        cd.extend_from_slice(spec.name.as_bytes());
        cd.extend_from_slice(&extra);
    }

    let cd_offset = out.len() as u64;
    let cd_size = cd.len() as u64;
    out.extend_from_slice(&cd);

    if zip64 {
        let eocd64_offset = out.len() as u64;
        out.extend_from_slice(&0x06064B50u32.to_le_bytes());
        out.extend_from_slice(&44u64.to_le_bytes());
        out.extend_from_slice(&45u16.to_le_bytes());
        out.extend_from_slice(&45u16.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(specs.len() as u64).to_le_bytes());
        out.extend_from_slice(&(specs.len() as u64).to_le_bytes());
        out.extend_from_slice(&cd_size.to_le_bytes());
        out.extend_from_slice(&cd_offset.to_le_bytes());

        out.extend_from_slice(&0x07064B50u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&eocd64_offset.to_le_bytes());
        out.extend_from_slice(&1u32.to_le_bytes());

        out.extend_from_slice(&0x06054B50u32.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0xFFFFu16.to_le_bytes());
        out.extend_from_slice(&0xFFFFu16.to_le_bytes());
        out.extend_from_slice(&0xFFFFFFFFu32.to_le_bytes());
        out.extend_from_slice(&0xFFFFFFFFu32.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
    } else {
        out.extend_from_slice(&0x06054B50u32.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&(specs.len() as u16).to_le_bytes());
        out.extend_from_slice(&(specs.len() as u16).to_le_bytes());
        out.extend_from_slice(&(cd_size as u32).to_le_bytes());
        out.extend_from_slice(&(cd_offset as u32).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
    }

    out
}

pub const LIPSUM: &[u8] = b"Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do \
eiusmod tempor incididunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, quis \
nostrud exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat.";

pub const LOREM: &[u8] = b"Duis aute irure dolor in reprehenderit in voluptate velit esse \
cillum dolore eu fugiat nulla pariatur. Excepteur sint occaecat cupidatat non proident, sunt \
in culpa qui officia deserunt mollit anim id est laborum.";

/// The five-entry layout used by the on-disk scenarios.
pub fn sample_entries() -> Vec<EntrySpec> {
    vec![
        EntrySpec::directory("folder/"),
        EntrySpec::deflated("folder/lipsum.txt", LIPSUM),
        EntrySpec::stored("folder/lorem.txt", LOREM),
        EntrySpec::deflated("lipsum.txt", LIPSUM),
        EntrySpec::stored("lorem.txt", LOREM),
    ]
}
