//! `leaf/kcap` archive decoder, ported from `kcap_archive_decoder.cc`.
//!
//! The container has a `"KCAP"` magic, a u32-LE entry count, and then one of
//! two fixed-size record layouts. Nothing in the header says which layout
//! is in force, so both are tried speculatively by checking whether the
//! *last* entry's `offset + size` lands exactly on EOF — a coincidence
//! that can hold for both layouts on the same file. The original decoder
//! runs both probes unconditionally and keeps whichever succeeded last, so
//! a v2-shaped file that also happens to satisfy the v1 probe is read as
//! v1. That quirk is preserved here rather than "fixed" (see DESIGN.md).

use encoding_rs::SHIFT_JIS;

use crate::decoder::{ArchiveDecoder, ArchiveEntry, ArchiveMeta, DecoderId};
use crate::error::{Error, Result};
use crate::file::File;
use crate::naming::NamingStrategy;
use crate::stream::ByteStream;

use super::lzss;

const MAGIC: &[u8] = b"KCAP";
const NAME_FIELD_LEN: usize = 24;

struct KcapEntry {
    name: String,
    offset: u64,
    size: u64,
    compressed: bool,
}

impl ArchiveEntry for KcapEntry {
    fn stored_path(&self) -> &str {
        &self.name
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Version {
    V1,
    V2,
}

pub struct KcapArchiveDecoder;

impl KcapArchiveDecoder {
    /// Probes both record layouts unconditionally; if both succeed, v2
    /// wins, matching the original's "last successful probe wins" order.
    fn detect_version(stream: &mut ByteStream, file_count: u64) -> Option<Version> {
        let header_end = stream.tell();
        let mut detected = None;

        let v1_record_len = (NAME_FIELD_LEN + 8) as u64;
        let _ = stream.peek(header_end, |s| {
            if file_count == 0 {
                return Ok(());
            }
            s.skip((file_count - 1) * v1_record_len)?;
            s.skip(NAME_FIELD_LEN as u64)?;
            let offset = s.read_u32_le()? as u64;
            let size = s.read_u32_le()? as u64;
            if offset + size == s.size() {
                detected = Some(Version::V1);
            }
            Ok(())
        });

        let v2_record_len = (4 + NAME_FIELD_LEN + 8) as u64;
        let _ = stream.peek(header_end, |s| {
            if file_count == 0 {
                return Ok(());
            }
            s.skip((file_count - 1) * v2_record_len)?;
            s.skip((4 + NAME_FIELD_LEN) as u64)?;
            let offset = s.read_u32_le()? as u64;
            let size = s.read_u32_le()? as u64;
            if offset + size == s.size() {
                detected = Some(Version::V2);
            }
            Ok(())
        });

        detected
    }

    fn read_meta_v1(stream: &mut ByteStream, file_count: u64) -> Result<ArchiveMeta> {
        let mut entries: Vec<Box<dyn ArchiveEntry>> = Vec::new();
        for _ in 0..file_count {
            let name = decode_sjis(&stream.read_to_zero(Some(NAME_FIELD_LEN))?);
            let offset = stream.read_u32_le()? as u64;
            let size = stream.read_u32_le()? as u64;
            entries.push(Box::new(KcapEntry { name, offset, size, compressed: true }));
        }
        Ok(ArchiveMeta::new(entries))
    }

    fn read_meta_v2(stream: &mut ByteStream, file_count: u64) -> Result<ArchiveMeta> {
        let mut entries: Vec<Box<dyn ArchiveEntry>> = Vec::new();
        for _ in 0..file_count {
            let entry_type = stream.read_u32_le()?;
            let name = decode_sjis(&stream.read_to_zero(Some(NAME_FIELD_LEN))?);
            let offset = stream.read_u32_le()? as u64;
            let size = stream.read_u32_le()? as u64;
            let compressed = match entry_type {
                0x0000_0000 => false,
                0x0000_0001 => true,
                _ if size == 0 => continue,
                _ => {
                    tracing::warn!(entry_type, "unknown KCAP entry type, assuming uncompressed");
                    false
                }
            };
            entries.push(Box::new(KcapEntry { name, offset, size, compressed }));
        }
        Ok(ArchiveMeta::new(entries))
    }
}

impl ArchiveDecoder for KcapArchiveDecoder {
    fn recognize(&self, file: &File) -> Result<bool> {
        let mut stream = file.stream.clone();
        stream.seek(0)?;
        Ok(stream.read(MAGIC.len())? == MAGIC)
    }

    fn read_meta(&self, file: &File) -> Result<ArchiveMeta> {
        let mut stream = file.stream.clone();
        stream.seek(MAGIC.len() as u64)?;
        let file_count = stream.read_u32_le()? as u64;

        match Self::detect_version(&mut stream, file_count) {
            Some(Version::V1) => Self::read_meta_v1(&mut stream, file_count),
            Some(Version::V2) => Self::read_meta_v2(&mut stream, file_count),
            None => Err(Error::UnsupportedVersion {
                path: file.path.clone().into(),
                decoder: "leaf/kcap".to_string(),
                version: 0,
            }),
        }
    }

    fn read_file(&self, file: &File, _meta: &ArchiveMeta, entry: &dyn ArchiveEntry) -> Result<File> {
        let entry = entry.as_any().downcast_ref::<KcapEntry>().expect("entry from this decoder's own read_meta");
        let mut stream = file.stream.clone();
        stream.seek(entry.offset)?;

        let data = if entry.compressed {
            let size_comp = stream.read_u32_le()? as usize;
            let size_orig = stream.read_u32_le()? as usize;
            let compressed = stream.read(size_comp - 8)?;
            lzss::decompress(&compressed, size_orig)?
        } else {
            stream.read(entry.size as usize)?
        };

        Ok(File::from_bytes(entry.name.clone(), data))
    }

    fn naming_strategy(&self) -> NamingStrategy {
        NamingStrategy::Child
    }

    fn linked_formats(&self) -> &[DecoderId] {
        static LINKED: std::sync::OnceLock<[DecoderId; 1]> = std::sync::OnceLock::new();
        LINKED.get_or_init(|| [DecoderId::from("truevision/tga")])
    }
}

fn decode_sjis(bytes: &[u8]) -> String {
    SHIFT_JIS.decode(bytes).0.into_owned()
}
