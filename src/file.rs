//! File value (C2): a logical path paired with a byte stream.

use crate::stream::ByteStream;

/// A `(path, stream)` pair passed between pipeline stages.
///
/// `path` is a logical relative path, forward-slash separated, never
/// starting with `/` (§3 invariant 1). A `File` is produced by the driver
/// (read from disk), by an archive decoder (member extraction), or by a
/// file decoder (transcode output). Files are immutable once handed to a
/// consumer; consumers may reseek `stream` but must not mutate its bytes —
/// cloning a `ByteStream` gives every consumer its own cursor over shared
/// backing storage.
#[derive(Clone)]
pub struct File {
    pub path: String,
    pub stream: ByteStream,
}

impl File {
    pub fn new(path: impl Into<String>, stream: ByteStream) -> Self {
        Self { path: path.into(), stream }
    }

    pub fn from_bytes(path: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { path: path.into(), stream: ByteStream::from_vec(bytes) }
    }

    /// The file stem: the path with its directory component and extension
    /// stripped, e.g. `path/test.archive` -> `test`.
    pub fn stem(&self) -> &str {
        let base = self.path.rsplit('/').next().unwrap_or(&self.path);
        match base.rfind('.') {
            Some(0) | None => base,
            Some(dot) => &base[..dot],
        }
    }
}
