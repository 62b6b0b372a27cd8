//! Output sink (C9) and the decode-event logger (§6.2 ambient stack).

use std::collections::HashSet;
use std::sync::Mutex;

use crate::decoder::DecoderId;

/// Append-only collector of `(path, bytes)` pairs, keyed by resolved path.
/// Duplicate paths are resolved with the same `_<n>` suffix rule the driver
/// uses for in-archive collisions (§4.8) — the sink is the second place
/// that rule applies, since two different archives unpacked into the same
/// destination tree can also collide.
pub trait Sink: Send + Sync {
    fn write(&self, path: &str, bytes: &[u8]) -> std::io::Result<()>;
}

/// Binds a sink to unique, collision-free paths. Wraps any [`Sink`] impl.
pub struct DedupingSink<S: Sink> {
    inner: S,
    seen: Mutex<HashSet<String>>,
}

impl<S: Sink> DedupingSink<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, seen: Mutex::new(HashSet::new()) }
    }

    /// Returns a path guaranteed not to collide with any path previously
    /// written through this sink, suffixing with `_<n>` for the smallest
    /// unused non-negative `n` (§4.6, §4.8).
    pub fn reserve_path(&self, desired: &str) -> String {
        let mut seen = self.seen.lock().unwrap();
        if seen.insert(desired.to_string()) {
            return desired.to_string();
        }
        let (stem, ext) = split_ext(desired);
        let mut n = 0u32;
        loop {
            let candidate = match ext {
                Some(ext) => format!("{stem}_{n}.{ext}"),
                None => format!("{stem}_{n}"),
            };
            if seen.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }

    pub fn write(&self, path: &str, bytes: &[u8]) -> std::io::Result<()> {
        self.inner.write(path, bytes)
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

fn split_ext(path: &str) -> (&str, Option<&str>) {
    let base = path.rsplit('/').next().unwrap_or(path);
    let prefix_len = path.len() - base.len();
    match base.rfind('.') {
        Some(0) | None => (path, None),
        Some(dot) => (&path[..prefix_len + dot], Some(&path[prefix_len + dot + 1..])),
    }
}

/// An in-memory sink used by tests and any caller that wants produced files
/// as a list instead of a filesystem tree.
#[derive(Default)]
pub struct MemorySink {
    files: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_files(self) -> Vec<(String, Vec<u8>)> {
        self.files.into_inner().unwrap()
    }
}

impl Sink for MemorySink {
    fn write(&self, path: &str, bytes: &[u8]) -> std::io::Result<()> {
        self.files.lock().unwrap().push((path.to_string(), bytes.to_vec()));
        Ok(())
    }
}

/// A filesystem-backed sink; the batch driver's default binding.
pub struct FsSink {
    root: std::path::PathBuf,
}

impl FsSink {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Sink for FsSink {
    fn write(&self, path: &str, bytes: &[u8]) -> std::io::Result<()> {
        let target = self.root.join(path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(target, bytes)
    }
}

/// The severity bucket a logged decode event belongs to, mirroring the
/// taxonomy in §7 minus `UnrecognizedInput` (which is not an error, just a
/// passthrough) and `InvalidStrategy`/`InvalidRegistration` (fatal, never
/// logged — they abort the driver instead).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    UnrecognizedInput,
    CorruptData,
    UnsupportedVersion,
    DepthExceeded,
}

/// Receives every non-fatal error with the originating file path and
/// decoder id (§7 "A logger (external) receives every non-fatal error...").
/// The default implementation forwards to `tracing`; the in-memory
/// implementation collects records for test assertions.
pub trait DecodeLogger: Send + Sync {
    fn log(&self, kind: EventKind, path: &str, decoder: Option<&DecoderId>, message: &str);
}

/// Forwards every event to `tracing` at a severity matching `EventKind`.
pub struct TracingLogger;

impl DecodeLogger for TracingLogger {
    fn log(&self, kind: EventKind, path: &str, decoder: Option<&DecoderId>, message: &str) {
        let decoder = decoder.map(DecoderId::to_string).unwrap_or_else(|| "-".to_string());
        match kind {
            EventKind::UnrecognizedInput => {
                tracing::debug!(path, decoder = %decoder, "{message}");
            }
            EventKind::CorruptData | EventKind::UnsupportedVersion => {
                tracing::warn!(path, decoder = %decoder, "{message}");
            }
            EventKind::DepthExceeded => {
                tracing::warn!(path, decoder = %decoder, "{message}");
            }
        }
    }
}

/// Collects events for test assertions instead of emitting them.
#[derive(Default)]
pub struct RecordingLogger {
    pub events: Mutex<Vec<(EventKind, String, Option<DecoderId>, String)>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DecodeLogger for RecordingLogger {
    fn log(&self, kind: EventKind, path: &str, decoder: Option<&DecoderId>, message: &str) {
        self.events.lock().unwrap().push((kind, path.to_string(), decoder.cloned(), message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_path_suffixes_on_collision() {
        let sink = DedupingSink::new(MemorySink::new());
        assert_eq!(sink.reserve_path("a.dat"), "a.dat");
        assert_eq!(sink.reserve_path("a.dat"), "a_0.dat");
        assert_eq!(sink.reserve_path("a.dat"), "a_1.dat");
    }

    #[test]
    fn reserve_path_without_extension() {
        let sink = DedupingSink::new(MemorySink::new());
        assert_eq!(sink.reserve_path("named"), "named");
        assert_eq!(sink.reserve_path("named"), "named_0");
    }
}
