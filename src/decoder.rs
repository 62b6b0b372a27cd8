//! Decoder interface (C4) and linked-formats hint (C8).

use std::any::Any;
use std::fmt;

use crate::error::Result;
use crate::file::File;
use crate::naming::NamingStrategy;

/// A stable, human-readable identifier of the form `namespace/name`, unique
/// across the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DecoderId(pub String);

impl DecoderId {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self(format!("{namespace}/{name}"))
    }
}

impl fmt::Display for DecoderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DecoderId {
    fn from(s: &str) -> Self {
        DecoderId(s.to_string())
    }
}

/// The metadata a decoder records about one container member (§3).
/// `path` is the name as stored, possibly empty; decoder-private fields
/// (offset, size, compression flag, …) are carried by the concrete type
/// behind this trait object rather than by downcasting a shared base
/// struct, per spec.md §9's "Per-decoder private entry data" note.
pub trait ArchiveEntry: Any + Send + Sync {
    /// The name as stored in the archive; empty if the member is nameless.
    fn stored_path(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
}

/// An ordered sequence of entries plus optional decoder-private header
/// state (shared palette, decryption seed, …). Order is significant: the
/// driver yields members in this order (§3).
pub struct ArchiveMeta {
    pub entries: Vec<Box<dyn ArchiveEntry>>,
}

impl ArchiveMeta {
    pub fn new(entries: Vec<Box<dyn ArchiveEntry>>) -> Self {
        Self { entries }
    }
}

/// `recognize` + `decode` one input file into exactly one output file.
pub trait FileDecoder: Send + Sync {
    /// Peek-only sniffing; must leave the stream position at 0 on return
    /// (§3 invariant 3, enforced by the router via `ByteStream::peek`).
    fn recognize(&self, file: &File) -> Result<bool>;

    /// Produces one output file. `path` defaults to the input path with
    /// this decoder's canonical extension substituted (§4.3).
    fn decode(&self, file: &File) -> Result<File>;

    /// Preferred downstream decoders for this decoder's output (§4.7).
    fn linked_formats(&self) -> &[DecoderId] {
        &[]
    }
}

/// `recognize` + enumerate + read member: one input file expands into
/// metadata plus N output files.
pub trait ArchiveDecoder: Send + Sync {
    fn recognize(&self, file: &File) -> Result<bool>;

    fn read_meta(&self, file: &File) -> Result<ArchiveMeta>;

    /// May be called in any order across entries; the decoder must
    /// tolerate this (§4.3).
    fn read_file(&self, file: &File, meta: &ArchiveMeta, entry: &dyn ArchiveEntry) -> Result<File>;

    /// Default naming strategy for this archive's members (§4.3).
    fn naming_strategy(&self) -> NamingStrategy {
        NamingStrategy::Child
    }

    fn linked_formats(&self) -> &[DecoderId] {
        &[]
    }
}

/// A tagged union over the two decoder capability sets (§9 "Polymorphic
/// decoders" — avoids a diamond hierarchy by separating "recognize + decode
/// one-to-one" from "recognize + enumerate + read member").
pub enum Decoder {
    File(Box<dyn FileDecoder>),
    Archive(Box<dyn ArchiveDecoder>),
}

impl Decoder {
    pub fn recognize(&self, file: &File) -> Result<bool> {
        match self {
            Decoder::File(d) => d.recognize(file),
            Decoder::Archive(d) => d.recognize(file),
        }
    }

    pub fn linked_formats(&self) -> &[DecoderId] {
        match self {
            Decoder::File(d) => d.linked_formats(),
            Decoder::Archive(d) => d.linked_formats(),
        }
    }
}
