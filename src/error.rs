//! Error taxonomy (§7).
//!
//! `UnrecognizedInput` has no variant here — it is the `None` case of
//! [`crate::router::Router::route`], not a thrown error. Everything else in
//! spec.md §7 maps onto a variant below.

use std::path::PathBuf;

/// The primary error type for all core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Recognized input but decoding failed: truncation, checksum mismatch,
    /// unexpected opcode, or a short/bad seek surfaced from the reader.
    #[error("corrupt data in {path:?} ({decoder}): {reason}")]
    CorruptData { path: PathBuf, decoder: String, reason: String },

    /// Known magic, unknown version. Treated identically to `CorruptData`
    /// by the driver (§7 item 3) but kept distinct so decoders and tests can
    /// name it precisely.
    #[error("unsupported version of {decoder} in {path:?}: {version}")]
    UnsupportedVersion { path: PathBuf, decoder: String, version: u32 },

    /// A read past EOF.
    #[error("end of stream: requested {requested} bytes, {available} available")]
    EndOfStream { requested: usize, available: usize },

    /// A seek past the end of the stream.
    #[error("invalid seek to {offset}, stream size is {size}")]
    InvalidSeek { offset: u64, size: u64 },

    /// Programmer error: an unknown `NamingStrategy` variant reached the
    /// resolver. Never surfaced to end users; aborts the driver.
    #[error("invalid naming strategy")]
    InvalidStrategy,

    /// Programmer error: the same `DecoderId` was registered twice.
    #[error("decoder already registered: {0}")]
    InvalidRegistration(crate::decoder::DecoderId),

    /// A bare filesystem/IO failure not yet attributed to a decoder.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// The severity categories the CLI's exit code is derived from (§7
/// "the user-visible exit code reflects the worst category observed").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Success = 0,
    InputError = 1,
    DecodeError = 2,
    InternalError = 3,
}

impl Error {
    pub fn severity(&self) -> Severity {
        match self {
            Error::CorruptData { .. }
            | Error::UnsupportedVersion { .. }
            | Error::EndOfStream { .. }
            | Error::InvalidSeek { .. } => Severity::DecodeError,
            Error::Io(_) => Severity::InputError,
            Error::InvalidStrategy | Error::InvalidRegistration(_) => Severity::InternalError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_seek_is_a_decode_error_not_an_input_error() {
        let err = Error::InvalidSeek { offset: 10, size: 4 };
        assert_eq!(err.severity(), Severity::DecodeError);
    }
}
