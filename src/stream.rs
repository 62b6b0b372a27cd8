//! Random-access byte-stream reader (C1).
//!
//! A `ByteStream` is a seekable, in-memory-or-file-backed view over a blob
//! with endian-aware primitive reads and a peek/restore facility. Every
//! concrete decoder sniffs and decodes exclusively through this type so that
//! `recognize` can never leave the stream position disturbed (§3 invariant
//! 3).

use std::io::{self, Read};
use std::sync::Arc;

use crate::error::{Error, Result};

/// Backing storage for a [`ByteStream`]. Both variants give O(1) random
/// access, which archive decoders rely on when calling `peek` repeatedly
/// (spec.md §5 "Memory").
#[derive(Clone)]
enum Backing {
    Memory(Arc<[u8]>),
    Mapped(Arc<memmap2::Mmap>),
}

impl Backing {
    fn as_slice(&self) -> &[u8] {
        match self {
            Backing::Memory(b) => b,
            Backing::Mapped(m) => m,
        }
    }
}

/// A seekable, cloneable byte container with a cursor.
///
/// Cloning a `ByteStream` is cheap (the backing storage is reference
/// counted) and yields an independent cursor — this is how the driver hands
/// the same underlying bytes to a decoder's `recognize` and `decode` without
/// the two interfering with each other's position.
#[derive(Clone)]
pub struct ByteStream {
    backing: Backing,
    pos: usize,
}

impl ByteStream {
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self { backing: Backing::Memory(Arc::from(bytes.into_boxed_slice())), pos: 0 }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::from_vec(bytes.to_vec())
    }

    /// Maps `file` for O(1) random access rather than reading it fully
    /// into memory.
    pub fn from_file(file: std::fs::File) -> io::Result<Self> {
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        Ok(Self { backing: Backing::Mapped(Arc::new(mmap)), pos: 0 })
    }

    pub fn size(&self) -> u64 {
        self.backing.as_slice().len() as u64
    }

    pub fn tell(&self) -> u64 {
        self.pos as u64
    }

    pub fn eof(&self) -> bool {
        self.pos as u64 >= self.size()
    }

    pub fn seek(&mut self, offset: u64) -> Result<()> {
        if offset > self.size() {
            return Err(Error::InvalidSeek { offset, size: self.size() });
        }
        self.pos = offset as usize;
        Ok(())
    }

    pub fn skip(&mut self, n: u64) -> Result<()> {
        self.seek(self.tell() + n)
    }

    fn remaining(&self) -> &[u8] {
        &self.backing.as_slice()[self.pos..]
    }

    pub fn read(&mut self, n: usize) -> Result<Vec<u8>> {
        let data = self.remaining();
        if data.len() < n {
            return Err(Error::EndOfStream { requested: n, available: data.len() });
        }
        let out = data[..n].to_vec();
        self.pos += n;
        Ok(out)
    }

    pub fn read_to_eof(&mut self) -> Vec<u8> {
        let out = self.remaining().to_vec();
        self.pos = self.backing.as_slice().len();
        out
    }

    /// Consumes bytes up to (and including) the first zero byte, or up to
    /// `limit` bytes if no terminator is found. The terminator itself is
    /// never included in the returned bytes (spec.md §4.1).
    ///
    /// With `limit` given, the field is fixed-width: the cursor always
    /// advances by the full `limit` (any bytes after the terminator are
    /// padding and get consumed as part of the slot), matching how
    /// `kcap.rs` reads its 24-byte name fields. With `limit = None` the
    /// cursor advances only past the terminator, leaving whatever follows
    /// in the stream for the next read.
    pub fn read_to_zero(&mut self, limit: Option<usize>) -> Result<Vec<u8>> {
        let data = self.remaining();
        let cap = limit.unwrap_or(data.len()).min(data.len());
        let zero_at = data[..cap].iter().position(|&b| b == 0);
        let out = match zero_at {
            Some(idx) => data[..idx].to_vec(),
            None => data[..cap].to_vec(),
        };
        let advance = match (limit, zero_at) {
            (Some(_), _) => cap,
            (None, Some(idx)) => idx + 1,
            (None, None) => cap,
        };
        self.pos += advance;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read(1)?[0])
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        let b = self.read(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u16_be(&mut self) -> Result<u16> {
        let b = self.read(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        let b = self.read(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        let b = self.read(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Scoped acquisition: stores the current position, invokes `thunk`,
    /// and restores the stored position on every exit path, including an
    /// early `Err` return from `thunk`. This is what lets `recognize`
    /// implementations read ahead freely while honoring §3 invariant 3.
    pub fn peek<T>(&mut self, offset: u64, thunk: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = self.pos;
        self.seek(offset)?;
        let mut this = scopeguard::guard(self, |s| {
            s.pos = saved;
        });
        thunk(&mut this)
    }
}

impl Read for ByteStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.remaining();
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        self.pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_to_zero_unbounded_stops_right_after_the_terminator() {
        let mut stream = ByteStream::from_bytes(&[0x00, 0x2a, 0x00, 0x00, 0x00]);
        assert_eq!(stream.read_to_zero(None).unwrap(), Vec::<u8>::new());
        assert_eq!(stream.tell(), 1);
        assert_eq!(stream.read_u32_le().unwrap(), 0x2a);
    }

    #[test]
    fn read_to_zero_unbounded_without_terminator_consumes_to_eof() {
        let mut stream = ByteStream::from_bytes(b"abc");
        assert_eq!(stream.read_to_zero(None).unwrap(), b"abc".to_vec());
        assert!(stream.eof());
    }

    #[test]
    fn read_to_zero_fixed_width_consumes_the_whole_field_past_the_terminator() {
        let mut bytes = b"hi".to_vec();
        bytes.resize(8, 0);
        bytes.extend_from_slice(&9u32.to_le_bytes());
        let mut stream = ByteStream::from_bytes(&bytes);
        assert_eq!(stream.read_to_zero(Some(8)).unwrap(), b"hi".to_vec());
        assert_eq!(stream.tell(), 8);
        assert_eq!(stream.read_u32_le().unwrap(), 9);
    }
}
